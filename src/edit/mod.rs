//! In-memory patch operations on a parsed [`Archive`].
//!
//! Patches mutate only the tree. No bytes move until the archive is handed
//! to a [`Writer`](crate::Writer); until then a patched file simply carries
//! its [`PayloadSupplier`] and a [`Token`] naming it.
//!
//! Every operation either completes or leaves the tree untouched. The walk
//! order guarantees this without rollback: a failure can only occur before
//! the first mutation, because once a missing folder has been created every
//! later component lands in a fresh, empty folder where nothing can
//! conflict.

use crate::error::{Error, Result};
use crate::read::{Archive, FileNode, Folder, FolderKey, FolderNode, Node, Token, RESERVED_ENTRIES};
use crate::supply::PayloadSupplier;

impl Folder {
    /// Inserts `node` into the tail, keeping entries after the reserved
    /// `.`/`..` references in ascending name order.
    pub(crate) fn insert_sorted(&mut self, node: Node) {
        let tail_start = RESERVED_ENTRIES.min(self.entries.len());
        let offset = self.entries[tail_start..]
            .iter()
            .position(|e| e.name() > node.name())
            .unwrap_or(self.entries.len() - tail_start);
        self.entries.insert(tail_start + offset, node);
    }
}

impl Archive {
    /// Creates an empty folder named `name` under `parent` and returns its
    /// key.
    ///
    /// Returns the existing key if `parent` already has a folder with that
    /// name. The new folder starts with only its reserved `.` and `..`
    /// references.
    ///
    /// # Errors
    ///
    /// [`Error::MissingMetadata`] if `parent` is not in the archive, and
    /// [`Error::NotADirectory`] if `parent` already has a file named
    /// `name`.
    pub fn add_folder(&mut self, parent: FolderKey, name: &str) -> Result<FolderKey> {
        let parent_folder = self.folders.get(&parent).ok_or(Error::MissingMetadata {
            key: parent.to_string(),
        })?;
        match parent_folder.get(name) {
            Some(Node::Folder(d)) => return Ok(d.key),
            Some(Node::File(_)) => {
                return Err(Error::NotADirectory {
                    name: name.to_string(),
                });
            }
            None => {}
        }

        // Keys of patched-in folders are placeholders; the rebuild assigns
        // every folder its real record address and rewrites the keys.
        let key = FolderKey(self.folders.keys().last().map_or(0, |k| k.0 + 1));
        log::debug!("adding folder '{name}' under {parent} as {key}");

        let folder = Folder {
            entries: vec![
                Node::Folder(FolderNode {
                    name: ".".to_string(),
                    key,
                    length: None,
                }),
                Node::Folder(FolderNode {
                    name: "..".to_string(),
                    key: parent,
                    length: None,
                }),
            ],
        };
        self.folders.insert(key, folder);

        // Parent existence was checked above; re-borrow mutably to link.
        if let Some(parent_folder) = self.folders.get_mut(&parent) {
            parent_folder.insert_sorted(Node::Folder(FolderNode {
                name: name.to_string(),
                key,
                length: None,
            }));
        }
        Ok(key)
    }

    /// Adds or replaces the file at `components`, creating missing folders
    /// along the way.
    ///
    /// `components` is the slash-split path from the root, final file name
    /// last. The returned [`Token`] identifies the patched file; the same
    /// path always yields the same token, so repeated patches of one path
    /// are idempotent (the last payload wins).
    ///
    /// # Errors
    ///
    /// [`Error::NotADirectory`] if a non-final component names an existing
    /// file, and [`Error::FileIsDirectory`] if the final component names an
    /// existing folder. Both are raised before any mutation.
    pub fn apply_patch(
        &mut self,
        components: &[&str],
        payload: Box<dyn PayloadSupplier>,
    ) -> Result<Token> {
        let Some((file_name, dirs)) = components.split_last() else {
            return Err(Error::IntegrityError {
                detail: "patch path has no components".to_string(),
            });
        };

        let mut key = FolderKey::ROOT;
        self.root()?;
        for name in dirs {
            let existing = self.folders.get(&key).and_then(|f| f.get(name));
            key = match existing {
                Some(Node::Folder(d)) => d.key,
                Some(Node::File(_)) => {
                    return Err(Error::NotADirectory {
                        name: name.to_string(),
                    });
                }
                None => self.add_folder(key, name)?,
            };
        }

        let token = Token::from_components(components);
        let folder = self.folders.get_mut(&key).ok_or(Error::MissingMetadata {
            key: key.to_string(),
        })?;
        match folder.get_mut(file_name) {
            Some(Node::File(file)) => {
                // Replacement keeps its original address so the rebuild's
                // flat-ordered pass still visits it in place.
                log::debug!("patch replaces existing file '{token}'");
                file.token = Some(token.clone());
                file.payload = Some(payload);
            }
            Some(Node::Folder(_)) => {
                return Err(Error::FileIsDirectory {
                    name: file_name.to_string(),
                });
            }
            None => {
                log::debug!("patch adds new file '{token}'");
                folder.insert_sorted(Node::File(FileNode {
                    name: file_name.to_string(),
                    flat_offset: None,
                    length: None,
                    token: Some(token.clone()),
                    payload: Some(payload),
                }));
            }
        }
        Ok(token)
    }
}
