//! Working copies on disk.
//!
//! Each pulled course lives in `<data_dir>/courses/<course_id>/` as two
//! pretty-printed JSON files: `snapshot.json` (what the server last
//! confirmed) and `working.json` (what the user is editing).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use coursesync_core::CourseTree;

const SNAPSHOT_FILE: &str = "snapshot.json";
const WORKING_FILE: &str = "working.json";

/// Snapshot and working tree of one course.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingCopy {
    pub snapshot: CourseTree,
    pub working: CourseTree,
}

#[derive(Clone, Debug)]
pub struct WorkingCopyStorage {
    data_dir: PathBuf,
}

impl WorkingCopyStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn course_dir(&self, course_id: u64) -> PathBuf {
        self.data_dir.join("courses").join(course_id.to_string())
    }

    pub fn snapshot_path(&self, course_id: u64) -> PathBuf {
        self.course_dir(course_id).join(SNAPSHOT_FILE)
    }

    pub fn working_path(&self, course_id: u64) -> PathBuf {
        self.course_dir(course_id).join(WORKING_FILE)
    }

    /// Loads both trees, or `None` if the course was never pulled.
    pub fn load(&self, course_id: u64) -> Result<Option<WorkingCopy>, StorageError> {
        let Some(snapshot) = read_tree(&self.snapshot_path(course_id), course_id)? else {
            return Ok(None);
        };
        let Some(working) = read_tree(&self.working_path(course_id), course_id)? else {
            return Ok(None);
        };
        Ok(Some(WorkingCopy { snapshot, working }))
    }

    /// Saves both trees, creating the course directory if needed.
    pub fn save(&self, copy: &WorkingCopy) -> Result<(), StorageError> {
        let course_id = copy.working.course_id;
        let dir = self.course_dir(course_id);
        fs::create_dir_all(&dir).map_err(|e| StorageError::IoError(dir.clone(), e))?;

        write_tree(&self.snapshot_path(course_id), &copy.snapshot)?;
        write_tree(&self.working_path(course_id), &copy.working)?;
        Ok(())
    }
}

fn read_tree(path: &Path, course_id: u64) -> Result<Option<CourseTree>, StorageError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::IoError(path.to_path_buf(), e)),
    };

    let tree: CourseTree = serde_json::from_str(&contents)
        .map_err(|e| StorageError::ParseError(path.to_path_buf(), e))?;
    if tree.course_id != course_id {
        return Err(StorageError::CourseMismatch {
            path: path.to_path_buf(),
            expected: course_id,
            found: tree.course_id,
        });
    }
    Ok(Some(tree))
}

fn write_tree(path: &Path, tree: &CourseTree) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(tree)
        .map_err(|e| StorageError::ParseError(path.to_path_buf(), e))?;
    fs::write(path, json + "\n").map_err(|e| StorageError::IoError(path.to_path_buf(), e))
}

/// Errors that can occur reading or writing working copies.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// The file is not a valid course tree.
    ParseError(PathBuf, serde_json::Error),
    /// The file belongs to another course.
    CourseMismatch {
        path: PathBuf,
        expected: u64,
        found: u64,
    },
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::ParseError(path, e) => {
                write!(f, "Invalid course file {}: {}", path.display(), e)
            }
            StorageError::CourseMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "{} holds course {}, expected course {}",
                path.display(),
                found,
                expected
            ),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::ParseError(_, e) => Some(e),
            StorageError::CourseMismatch { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursesync_core::{EntityId, Lesson, Section};
    use tempfile::TempDir;

    fn test_storage() -> (WorkingCopyStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = WorkingCopyStorage::new(temp_dir.path().to_path_buf());
        (storage, temp_dir)
    }

    fn copy() -> WorkingCopy {
        let snapshot = CourseTree::new(7).with_sections(vec![Section::new(
            EntityId::Server(1),
            7,
            "Basics",
        )
        .persisted()]);
        let mut working = snapshot.clone();
        working.sections[0]
            .lessons
            .push(Lesson::new(EntityId::Temporary(1), EntityId::Server(1), "Draft"));
        WorkingCopy { snapshot, working }
    }

    #[test]
    fn test_load_missing_returns_none() {
        let (storage, _temp) = test_storage();
        assert!(storage.load(7).unwrap().is_none());
        assert!(!storage.snapshot_path(7).exists());
    }

    #[test]
    fn test_save_and_load() {
        let (storage, _temp) = test_storage();
        let copy = copy();

        storage.save(&copy).unwrap();
        assert!(storage.snapshot_path(7).exists());
        assert!(storage.working_path(7).ends_with("courses/7/working.json"));

        let loaded = storage.load(7).unwrap().unwrap();
        assert_eq!(loaded, copy);
    }

    #[test]
    fn test_temporary_ids_are_negative_on_disk() {
        let (storage, _temp) = test_storage();
        storage.save(&copy()).unwrap();

        let json = fs::read_to_string(storage.working_path(7)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["sections"][0]["lessons"][0]["id"], -1);
        assert_eq!(value["sections"][0]["lessons"][0]["section_id"], 1);
    }

    #[test]
    fn test_hand_edited_working_copy() {
        let (storage, _temp) = test_storage();
        storage.save(&copy()).unwrap();
        fs::write(
            storage.working_path(7),
            r#"{"course_id": 7, "sections": [
                {"id": 1, "course_id": 7, "name": "Renamed", "persisted": false},
                {"id": -2, "course_id": 7, "name": "Added"}
            ]}"#,
        )
        .unwrap();

        let loaded = storage.load(7).unwrap().unwrap();
        assert_eq!(loaded.working.sections[0].name, "Renamed");
        assert!(!loaded.working.sections[0].persisted);
        assert_eq!(loaded.working.sections[1].id, EntityId::Temporary(2));
    }

    #[test]
    fn test_course_mismatch() {
        let (storage, _temp) = test_storage();
        storage.save(&copy()).unwrap();
        fs::write(storage.working_path(7), r#"{"course_id": 8}"#).unwrap();

        let err = storage.load(7).unwrap_err();
        assert!(matches!(
            err,
            StorageError::CourseMismatch {
                expected: 7,
                found: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_json() {
        let (storage, _temp) = test_storage();
        storage.save(&copy()).unwrap();
        fs::write(storage.snapshot_path(7), "{ not json").unwrap();

        let err = storage.load(7).unwrap_err();
        assert!(err.to_string().starts_with("Invalid course file"));
    }
}
