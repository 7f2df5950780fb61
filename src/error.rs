use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Error {
    pub fn is_connection_error(&self) -> bool {
        self.code == 1
    }

    pub fn is_routing_error(&self) -> bool {
        self.code == 100
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

pub fn connection_error() -> Error {
    Error {
        code: 1,
        message: "could not connect to the server".into(),
    }
}

pub fn invalid_config_error(key: &str) -> Error {
    Error {
        code: 2,
        message: format!("invalid configuration value for {}", key),
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: 4,
        message: "unexpected response from the server".into(),
    }
}

pub fn routing_error(detail: Option<String>) -> Error {
    Error {
        code: 100,
        message: detail.unwrap_or_else(|| "failed to compute route".into()),
    }
}

pub fn invalid_state_error() -> Error {
    Error {
        code: 101,
        message: "invalid state".into(),
    }
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    if err.is_decode() {
        upstream_error()
    } else {
        connection_error()
    }
}

#[test]
fn routing_error_detail_test() {
    assert_eq!(routing_error(Some("no path".into())).message, "no path");
    assert_eq!(routing_error(None).message, "failed to compute route");
    assert!(routing_error(None).is_routing_error());
    assert!(!connection_error().is_routing_error());
}
