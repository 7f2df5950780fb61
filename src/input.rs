use crate::entities::{Coordinates, Role};

pub const HELP: &str = "commands: click <lat> <lon> | drag <start|end> <lat> <lon> | reset | show | quit";

/// One line of user input for the console host.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Click(Coordinates),
    Drag(Role, Coordinates),
    Reset,
    Show,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            ["click", lat, lon] => Some(Self::Click(coordinates(lat, lon)?)),
            ["drag", role, lat, lon] => {
                let role = match *role {
                    "start" => Role::Start,
                    "end" => Role::End,
                    _ => return None,
                };
                Some(Self::Drag(role, coordinates(lat, lon)?))
            }
            ["reset"] => Some(Self::Reset),
            ["show"] => Some(Self::Show),
            ["help"] | ["?"] => Some(Self::Help),
            ["quit"] | ["exit"] => Some(Self::Quit),
            _ => None,
        }
    }
}

fn coordinates(lat: &str, lon: &str) -> Option<Coordinates> {
    Some(Coordinates::new(lat.parse().ok()?, lon.parse().ok()?))
}

#[test]
fn parse_commands_test() {
    assert_eq!(
        Command::parse("click -15.84 -70.02"),
        Some(Command::Click(Coordinates::new(-15.84, -70.02)))
    );
    assert_eq!(
        Command::parse("  drag end 1 2 "),
        Some(Command::Drag(Role::End, Coordinates::new(1.0, 2.0)))
    );
    assert_eq!(Command::parse("reset"), Some(Command::Reset));
    assert_eq!(Command::parse("exit"), Some(Command::Quit));
}

#[test]
fn reject_malformed_commands_test() {
    assert_eq!(Command::parse(""), None);
    assert_eq!(Command::parse("click 1"), None);
    assert_eq!(Command::parse("click north 2"), None);
    assert_eq!(Command::parse("drag middle 1 2"), None);
}
