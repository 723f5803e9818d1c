use clap::{Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .help("Verbosity level: ERROR (default), -v WARN, -vv INFO, -vvv DEBUG, -vvvv TRACE")
            .action(ArgAction::Count),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_counts_flags() {
        let command = with_args(Command::new("sesio"));
        let matches = command.try_get_matches_from(vec!["sesio", "-vvv"]);
        assert!(matches.is_ok());
        if let Ok(matches) = matches {
            assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(3));
        }
    }
}
