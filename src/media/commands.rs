use std::path::Path;
use std::process::Output;

use tokio::process::Command;
use tracing::debug;

use crate::error::{DubError, Result};

/// An external media tool invocation, built up argument by argument.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn copy_video(self) -> Self {
        self.arg("-c:v").arg("copy")
    }

    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Drop container metadata and encoder tags so repeated runs write identical bytes.
    pub fn bitexact(self) -> Self {
        self.args(["-map_metadata", "-1", "-fflags", "+bitexact", "-flags:a", "+bitexact"])
    }

    /// Name reported in errors: the binary's file name without its directory.
    pub fn tool_name(&self) -> String {
        Path::new(&self.binary_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary_path.clone())
    }

    async fn spawn(&self) -> Result<Output> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        Command::new(&self.binary_path)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DubError::Process {
                tool: self.tool_name(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })
    }

    /// Run to completion; a non-zero exit becomes a `Process` error with the captured stderr.
    pub async fn execute(&self) -> Result<()> {
        self.execute_with_output().await.map(|_| ())
    }

    /// Like `execute`, returning stdout.
    pub async fn execute_with_output(&self) -> Result<String> {
        let output = self.spawn().await?;

        if !output.status.success() {
            return Err(DubError::Process {
                tool: self.tool_name(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for the ffmpeg invocations the pipeline needs.
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// 16-bit PCM, 44.1 kHz stereo WAV from the video's audio stream.
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .arg("-acodec")
            .arg("pcm_s16le")
            .audio_sample_rate(44100)
            .audio_channels(2)
            .bitexact()
            .overwrite()
            .output(audio_path)
    }

    /// 16-bit PCM WAV from any audio input, keeping its rate and channel layout.
    pub fn normalize_audio<P: AsRef<Path>>(&self, input_path: P, wav_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio normalization")
            .input(input_path)
            .no_video()
            .arg("-acodec")
            .arg("pcm_s16le")
            .bitexact()
            .overwrite()
            .output(wav_path)
    }

    /// Original video stream copied, audio replaced by `audio_path`.
    pub fn remux<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        audio_codec: &str,
        audio_bitrate: &str,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Remux")
            .input(video_path)
            .input(audio_path)
            .copy_video()
            .audio_codec(audio_codec)
            .arg("-b:a")
            .arg(audio_bitrate)
            .args(["-map", "0:v", "-map", "1:a", "-shortest"])
            .overwrite()
            .output(output_path)
    }

    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}
