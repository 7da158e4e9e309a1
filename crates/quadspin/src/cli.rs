use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "quadspin",
    author,
    version,
    about = "Spins a red quad and prints the frame rate once per second"
)]
pub struct Args {
    /// Cover the primary monitor with a borderless fullscreen window.
    #[arg(short, long)]
    pub fullscreen: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windowed_by_default() {
        let args = Args::try_parse_from(["quadspin"]).expect("parse");
        assert!(!args.fullscreen);
    }

    #[test]
    fn short_and_long_fullscreen_flags() {
        assert!(Args::try_parse_from(["quadspin", "-f"]).expect("short").fullscreen);
        assert!(
            Args::try_parse_from(["quadspin", "--fullscreen"])
                .expect("long")
                .fullscreen
        );
    }

    #[test]
    fn rejects_positional_arguments() {
        assert!(Args::try_parse_from(["quadspin", "extra"]).is_err());
    }
}
