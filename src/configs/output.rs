use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Player executable spawned once per track.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments; `{input}` is replaced by the locator and `{target}` by the sink name.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Prepended to `args` when the source is streamed rather than downloaded.
    #[serde(default = "default_stream_args")]
    pub stream_args: Vec<String>,
    /// Sinks a session may connect to. Empty accepts any target hint.
    #[serde(default)]
    pub targets: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            stream_args: default_stream_args(),
            targets: Vec::new(),
        }
    }
}

fn default_program() -> String {
    "ffplay".to_string()
}

fn default_args() -> Vec<String> {
    ["-nodisp", "-autoexit", "-loglevel", "error", "{input}"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_stream_args() -> Vec<String> {
    [
        "-reconnect",
        "1",
        "-reconnect_streamed",
        "1",
        "-reconnect_delay_max",
        "5",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
