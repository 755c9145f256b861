//! Turning fired cues into sound.
//!
//! - [`Dispatcher`]: per-tick background resolution of audio
//! - [`synth`]: text-to-speech and deterministic file naming
//! - [`playback`]: the serial playback worker

pub mod dispatcher;
pub mod playback;
pub mod synth;

pub use dispatcher::{AudioRecorder, Dispatcher};
pub use playback::{AudioPlayer, CommandPlayer, LogPlayer, PlaybackQueue};
pub use synth::{CommandSynthesizer, SpeechSynthesizer, audio_file_name};

/// Substitutes `{placeholder}` values into every argument of an argv
/// template. Values are inserted verbatim in a single pass, so a value
/// containing a placeholder is not expanded again. No shell is involved.
#[must_use]
pub fn render_command(template: &[String], values: &[(&str, &str)]) -> Vec<String> {
    template.iter().map(|arg| render_arg(arg, values)).collect()
}

fn render_arg(arg: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    'scan: while !rest.is_empty() {
        for (key, value) in values {
            if let Some(tail) = rest.strip_prefix(key) {
                out.push_str(value);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_each_argument() {
        let template: Vec<String> = ["espeak-ng", "-w", "{output}", "{text}"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let argv = render_command(&template, &[
            ("{text}", "gank bot; rm -rf /"),
            ("{output}", "audio/x.wav"),
        ]);
        assert_eq!(argv, [
            "espeak-ng",
            "-w",
            "audio/x.wav",
            "gank bot; rm -rf /"
        ]);
    }

    #[test]
    fn test_render_does_not_expand_inside_values() {
        let template = vec!["--say={text}".to_string(), "{output}".to_string()];
        let argv = render_command(&template, &[("{text}", "{output}"), ("{output}", "o.wav")]);
        assert_eq!(argv, ["--say={output}", "o.wav"]);
    }
}
