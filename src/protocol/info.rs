use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub version: Version,
    pub build_time: u64,
    pub git: GitInfo,
    pub extractor: String,
    pub catalog_lookup: bool,
    pub sessions: usize,
    pub active_outputs: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub semver: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_release: Option<String>,
}

impl Version {
    pub fn parse(semver: &str) -> Self {
        let (core, pre_release) = match semver.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (semver, None),
        };
        let core = core.split('+').next().unwrap_or(core);
        let mut parts = core.split('.').map(|p| p.parse().unwrap_or(0));
        Self {
            semver: semver.to_string(),
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
            pre_release,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitInfo {
    pub branch: String,
    pub commit: String,
    pub commit_time: u64,
}

impl GitInfo {
    /// Values baked in by the build script.
    pub fn current() -> Self {
        Self {
            branch: option_env!("GIT_BRANCH").unwrap_or("unknown").to_string(),
            commit: option_env!("GIT_COMMIT").unwrap_or("unknown").to_string(),
            commit_time: option_env!("GIT_COMMIT_TIME")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        }
    }
}
