use std::fmt;

/// Transmission direction of a media or track, relative to this relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SendOnly,
    RecvOnly,
    SendRecv,
    Inactive,
}

pub const DIRECTION_SEND_ONLY_STR: &str = "sendonly";
pub const DIRECTION_RECV_ONLY_STR: &str = "recvonly";
pub const DIRECTION_SEND_RECV_STR: &str = "sendrecv";
pub const DIRECTION_INACTIVE_STR: &str = "inactive";

impl Direction {
    /// Parses an SDP direction attribute, defaulting to `RecvOnly` when absent,
    /// matching a producer context where unmarked media is assumed receivable.
    pub fn parse(raw: &str) -> Direction {
        match raw {
            DIRECTION_SEND_ONLY_STR => Direction::SendOnly,
            DIRECTION_SEND_RECV_STR => Direction::SendRecv,
            DIRECTION_INACTIVE_STR => Direction::Inactive,
            _ => Direction::RecvOnly,
        }
    }

    /// The direction the other side of a bound pair must have.
    pub fn complement(self) -> Direction {
        match self {
            Direction::SendOnly => Direction::RecvOnly,
            Direction::RecvOnly => Direction::SendOnly,
            Direction::SendRecv => Direction::SendRecv,
            Direction::Inactive => Direction::Inactive,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::SendOnly => DIRECTION_SEND_ONLY_STR,
            Direction::RecvOnly => DIRECTION_RECV_ONLY_STR,
            Direction::SendRecv => DIRECTION_SEND_RECV_STR,
            Direction::Inactive => DIRECTION_INACTIVE_STR,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_to_recvonly() {
        assert_eq!(Direction::parse(""), Direction::RecvOnly);
        assert_eq!(Direction::parse("bogus"), Direction::RecvOnly);
    }

    #[test]
    fn complement_is_involutive() {
        for d in [
            Direction::SendOnly,
            Direction::RecvOnly,
            Direction::SendRecv,
            Direction::Inactive,
        ] {
            assert_eq!(d.complement().complement(), d);
        }
    }
}
