use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Directional policy for a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// The better version wins whichever side it is on
    #[default]
    Bidirectional,
    /// Only remote -> local copies
    DownloadOnly,
    /// Only local -> remote copies
    UploadOnly,
    /// Both directions, never overwriting a strictly newer file
    IncrementalBoth,
}

impl SyncMode {
    pub const ALL: [SyncMode; 4] = [
        SyncMode::Bidirectional,
        SyncMode::DownloadOnly,
        SyncMode::UploadOnly,
        SyncMode::IncrementalBoth,
    ];

    /// Whether the local tree has to be walked for this mode.
    pub fn scans_local(&self) -> bool {
        !matches!(self, SyncMode::DownloadOnly)
    }

    /// Whether the remote tree has to be walked for this mode.
    pub fn scans_remote(&self) -> bool {
        !matches!(self, SyncMode::UploadOnly)
    }

    /// Whether a run in this mode may carry out `decision`.
    pub fn allows(&self, decision: SyncDecision) -> bool {
        match (self, decision) {
            (_, SyncDecision::Skip) => true,
            (SyncMode::DownloadOnly, SyncDecision::CopyToRemote) => false,
            (SyncMode::UploadOnly, SyncDecision::CopyToLocal) => false,
            _ => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Bidirectional => "bidirectional",
            SyncMode::DownloadOnly => "download-only",
            SyncMode::UploadOnly => "upload-only",
            SyncMode::IncrementalBoth => "incremental-both",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "bidirectional" | "both" => Ok(SyncMode::Bidirectional),
            "download-only" | "download" => Ok(SyncMode::DownloadOnly),
            "upload-only" | "upload" => Ok(SyncMode::UploadOnly),
            "incremental-both" | "incremental" => Ok(SyncMode::IncrementalBoth),
            _ => Err(SyncError::InvalidMode(s.to_string())),
        }
    }
}

/// What to do with one relative path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SyncDecision {
    CopyToRemote,
    CopyToLocal,
    Skip,
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDecision::CopyToRemote => write!(f, "copy-to-remote"),
            SyncDecision::CopyToLocal => write!(f, "copy-to-local"),
            SyncDecision::Skip => write!(f, "skip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_cli_spellings() {
        assert_eq!("download-only".parse::<SyncMode>().unwrap(), SyncMode::DownloadOnly);
        assert_eq!("Upload_Only".parse::<SyncMode>().unwrap(), SyncMode::UploadOnly);
        assert_eq!(
            "incremental-both".parse::<SyncMode>().unwrap(),
            SyncMode::IncrementalBoth
        );
        assert!("sideways".parse::<SyncMode>().is_err());
    }

    #[test]
    fn mode_display_round_trips_through_parse() {
        for mode in SyncMode::ALL {
            assert_eq!(mode.to_string().parse::<SyncMode>().unwrap(), mode);
        }
    }

    #[test]
    fn mode_serializes_kebab_case() {
        let json = serde_json::to_string(&SyncMode::IncrementalBoth).unwrap();
        assert_eq!(json, "\"incremental-both\"");
    }

    #[test]
    fn one_way_modes_forbid_the_other_direction() {
        assert!(!SyncMode::DownloadOnly.allows(SyncDecision::CopyToRemote));
        assert!(SyncMode::DownloadOnly.allows(SyncDecision::CopyToLocal));
        assert!(!SyncMode::UploadOnly.allows(SyncDecision::CopyToLocal));
        assert!(SyncMode::IncrementalBoth.allows(SyncDecision::CopyToLocal));
        assert!(SyncMode::Bidirectional.allows(SyncDecision::CopyToRemote));
    }

    #[test]
    fn one_way_modes_scan_one_side() {
        assert!(!SyncMode::DownloadOnly.scans_local());
        assert!(SyncMode::DownloadOnly.scans_remote());
        assert!(SyncMode::UploadOnly.scans_local());
        assert!(!SyncMode::UploadOnly.scans_remote());
        assert!(SyncMode::Bidirectional.scans_local() && SyncMode::Bidirectional.scans_remote());
    }
}
