use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dub a single English video into Arabic
    Dub {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for the dubbed video
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Speech-to-text model, overriding the duration-based choice
        #[arg(long)]
        stt_model: Option<String>,
    },

    /// Dub every video file in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for the dubbed videos
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Maximum number of videos processed at once
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Extract the audio track of a video as WAV
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Transcribe an audio file to English text
    Transcribe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Output transcript file
        #[arg(short, long)]
        output: PathBuf,

        /// Speech-to-text model, overriding the duration-based choice
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Translate an English text file to Arabic
    Translate {
        /// Input text file
        #[arg(short, long)]
        input: PathBuf,

        /// Output translated file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Synthesize speech from a text file
    Speak {
        /// Input text file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,

        /// Only speak the quoted segments of the text
        #[arg(long)]
        quoted_only: bool,
    },

    /// Interactive chat with the language model
    Chat,

    /// Check that external tools and the API key are available
    Doctor,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "dubar.toml")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dub() {
        let args = Args::try_parse_from([
            "dubar", "-v", "dub", "--input", "talk.mp4", "--stt-model", "Fanar-Aura-STT-LF-1",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Commands::Dub { input, output_dir, stt_model } => {
                assert_eq!(input, PathBuf::from("talk.mp4"));
                assert!(output_dir.is_none());
                assert_eq!(stt_model.as_deref(), Some("Fanar-Aura-STT-LF-1"));
            }
            _ => panic!("expected dub"),
        }
    }

    #[test]
    fn test_parse_speak_quoted_only() {
        let args =
            Args::try_parse_from(["dubar", "speak", "-i", "a.txt", "-o", "a.wav", "--quoted-only"])
                .unwrap();
        assert!(matches!(args.command, Commands::Speak { quoted_only: true, .. }));
    }

    #[test]
    fn test_init_config_default_path() {
        let args = Args::try_parse_from(["dubar", "init-config"]).unwrap();
        match args.command {
            Commands::InitConfig { output } => assert_eq!(output, PathBuf::from("dubar.toml")),
            _ => panic!("expected init-config"),
        }
    }
}
