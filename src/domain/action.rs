use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SimError;

/// One discrete command per vehicle per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Accelerate,
    Brake,
    TurnLeft,
    TurnRight,
    #[default]
    Coast,
}

impl FromStr for Action {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accelerate" | "forward" => Ok(Action::Accelerate),
            "brake" | "backward" => Ok(Action::Brake),
            "left" | "turn_left" => Ok(Action::TurnLeft),
            "right" | "turn_right" => Ok(Action::TurnRight),
            "coast" | "stop" => Ok(Action::Coast),
            _ => Err(SimError::UnknownAction(s.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Accelerate => "accelerate",
            Action::Brake => "brake",
            Action::TurnLeft => "left",
            Action::TurnRight => "right",
            Action::Coast => "coast",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    Accelerate,
    Brake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steer {
    Left,
    Right,
}

/// Throttle and steering applied together in one tick.
///
/// A single [`Action`] sets at most one of the two; keyboard-style input can
/// set both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub throttle: Option<Throttle>,
    pub steer: Option<Steer>,
}

impl Controls {
    pub fn new(throttle: Option<Throttle>, steer: Option<Steer>) -> Self {
        Self { throttle, steer }
    }
}

impl From<Action> for Controls {
    fn from(action: Action) -> Self {
        match action {
            Action::Accelerate => Controls::new(Some(Throttle::Accelerate), None),
            Action::Brake => Controls::new(Some(Throttle::Brake), None),
            Action::TurnLeft => Controls::new(None, Some(Steer::Left)),
            Action::TurnRight => Controls::new(None, Some(Steer::Right)),
            Action::Coast => Controls::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_str_aliases() {
        assert_eq!("forward".parse::<Action>().unwrap(), Action::Accelerate);
        assert_eq!("Accelerate".parse::<Action>().unwrap(), Action::Accelerate);
        assert_eq!("backward".parse::<Action>().unwrap(), Action::Brake);
        assert_eq!("left".parse::<Action>().unwrap(), Action::TurnLeft);
        assert_eq!(" right ".parse::<Action>().unwrap(), Action::TurnRight);
        assert_eq!("stop".parse::<Action>().unwrap(), Action::Coast);
        assert_eq!(
            "jump".parse::<Action>(),
            Err(SimError::UnknownAction("jump".to_string()))
        );
    }

    #[test]
    fn test_action_display_round_trips() {
        for action in [
            Action::Accelerate,
            Action::Brake,
            Action::TurnLeft,
            Action::TurnRight,
            Action::Coast,
        ] {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_action_to_controls() {
        assert_eq!(Controls::from(Action::Coast), Controls::default());
        let c = Controls::from(Action::TurnLeft);
        assert_eq!(c.steer, Some(Steer::Left));
        assert_eq!(c.throttle, None);
    }
}
