//! The fixed delivery encode profile.

use serde::Serialize;
use std::ffi::OsString;
use std::path::Path;

/// Codec and container options applied to every conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncodeProfile {
    pub container: &'static str,
    pub extension: &'static str,
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
    /// Move the moov atom to the front for progressive playback.
    pub faststart: bool,
}

/// H.264 + AAC in MP4 with faststart: plays nearly everywhere.
pub const DELIVERY_PROFILE: EncodeProfile = EncodeProfile {
    container: "mp4",
    extension: "mp4",
    video_codec: "libx264",
    audio_codec: "aac",
    faststart: true,
};

impl EncodeProfile {
    /// Output options, without input/output paths.
    pub fn output_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.video_codec.to_string(),
            "-c:a".to_string(),
            self.audio_codec.to_string(),
        ];
        if self.faststart {
            args.push("-movflags".to_string());
            args.push("+faststart".to_string());
        }
        args.push("-f".to_string());
        args.push(self.container.to_string());
        args
    }

    /// Full ffmpeg argument list for converting `input` into `output`.
    ///
    /// -nostdin: never wait on the terminal
    /// -loglevel error: stderr carries only the diagnostic
    /// -y: an existing output is overwritten
    pub fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.extend(self.output_args().into_iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }
}
