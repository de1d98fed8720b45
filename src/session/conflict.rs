//! Remote-change detection by version marker.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::store::Project;

/// The project's `updated_at` as last seen by this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionMarker(pub DateTime<Utc>);

impl VersionMarker {
    pub fn of(project: &Project) -> Self {
        Self(project.updated_at)
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// How the user settles a conflict. No partial merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Write the local buffer over the remote copy.
    KeepLocal,
    /// Drop the local buffer and reload the remote copy.
    DiscardLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub local: VersionMarker,
    pub remote: VersionMarker,
}

/// A conflict exists when the store moved past the marker we hold.
pub fn detect(known: VersionMarker, current: &Project) -> Option<Conflict> {
    let remote = VersionMarker::of(current);
    (remote != known).then_some(Conflict {
        local: known,
        remote,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProjectId;

    fn project_at(at: DateTime<Utc>) -> Project {
        Project {
            id: ProjectId::from("p"),
            owner_id: "u".into(),
            title: "CV".into(),
            typ_path: "u/p.typ".into(),
            thumbnail_path: None,
            updated_at: at,
            project_type: "resume".into(),
        }
    }

    #[test]
    fn test_same_marker_no_conflict() {
        let now = Utc::now();
        assert!(detect(VersionMarker(now), &project_at(now)).is_none());
    }

    #[test]
    fn test_moved_marker_conflicts() {
        let now = Utc::now();
        let later = now + chrono::Duration::seconds(3);
        let conflict = detect(VersionMarker(now), &project_at(later)).unwrap();
        assert_eq!(conflict.remote, VersionMarker(later));
        assert_eq!(conflict.local, VersionMarker(now));
    }
}
