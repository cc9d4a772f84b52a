//! Logging initialization

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::AgentError;

/// Install the global subscriber at `level` (INFO when unparseable)
pub fn init_logging(level: &str) -> Result<(), AgentError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AgentError::Logging(e.to_string()))
}

fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("loud"), Level::INFO);
    }
}
