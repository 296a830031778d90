//! Parsers for git's machine-readable output formats.

use std::collections::HashMap;

use revkit_api::{Author, CommitRecord, DiffStats, FileStatus};
use revkit_backend_api::{FileChange, PeeledCommit, StatusEntry, TagAnnotation, TagRef};

pub(crate) const FIELD_SEP: char = '\u{1f}';
pub(crate) const RECORD_SEP: char = '\u{1e}';

/// `git log --format` producing [`parse_log`] input.
pub(crate) const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%at%x1f%B%x1e";

/// `git for-each-ref --format` producing [`parse_tag_refs`] input.
pub(crate) const TAG_FORMAT: &str = "--format=%(refname:lstrip=2)%1f%(objecttype)%1f%(objectname)%1f%(*objecttype)%1f%(*objectname)%1f%(taggerdate:unix)%1f%(authordate:unix)%1f%(*authordate:unix)%1f%(contents)%1e";

/// `git log --format` producing [`parse_peeled`] input.
pub(crate) const PEEL_FORMAT: &str = "--format=%H%x1f%at";

/// Non-blank, trimmed records split on [`RECORD_SEP`].
fn records(output: &str) -> impl Iterator<Item = &str> {
    output
        .split(RECORD_SEP)
        .map(str::trim)
        .filter(|record| !record.is_empty())
}

pub(crate) fn parse_log(output: &str) -> Vec<CommitRecord> {
    records(output)
        .filter_map(|record| {
            let mut fields = record.splitn(5, FIELD_SEP);
            let hash = fields.next()?;
            let name = fields.next()?;
            let email = fields.next()?;
            let timestamp = fields.next()?.trim().parse().unwrap_or_default();
            let message = fields.next().unwrap_or_default();
            Some(CommitRecord::new(
                hash,
                message,
                Author::new(name, email),
                timestamp,
            ))
        })
        .collect()
}

pub(crate) fn parse_tag_refs(output: &str) -> Vec<TagRef> {
    records(output).filter_map(parse_tag_record).collect()
}

fn parse_tag_record(record: &str) -> Option<TagRef> {
    let fields: Vec<&str> = record.splitn(9, FIELD_SEP).collect();
    let [name, object_type, object, peeled_type, peeled, tagger_date, author_date, peeled_author_date, contents] =
        fields.as_slice()
    else {
        return None;
    };

    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let (annotation, commit) = match object_type.trim() {
        "tag" => {
            let annotation = TagAnnotation {
                message: (*contents).to_owned(),
                tagger_time: parse_time(tagger_date),
            };
            let commit = (peeled_type.trim() == "commit")
                .then(|| peeled_commit(peeled, peeled_author_date))
                .flatten();
            (Some(annotation), commit)
        }
        "commit" => (None, peeled_commit(object, author_date)),
        _ => (None, None),
    };

    Some(TagRef {
        name: name.to_owned(),
        target: object.trim().to_owned(),
        annotation,
        commit,
    })
}

pub(crate) fn parse_peeled(output: &str) -> Option<PeeledCommit> {
    let (hash, author_date) = output.trim().split_once(FIELD_SEP)?;
    peeled_commit(hash, author_date)
}

fn peeled_commit(hash: &str, author_date: &str) -> Option<PeeledCommit> {
    let hash = hash.trim();
    if hash.is_empty() {
        return None;
    }
    Some(PeeledCommit {
        hash: hash.to_owned(),
        author_time: parse_time(author_date)?,
    })
}

fn parse_time(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

/// Parse `git status --porcelain=v1 -z` output.
pub(crate) fn parse_porcelain_status(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut fields = output.split('\0');

    while let Some(field) = fields.next() {
        let mut chars = field.chars();
        let (Some(x), Some(y)) = (chars.next(), chars.next()) else {
            continue;
        };
        let Some(path) = field.get(3..).filter(|path| !path.is_empty()) else {
            continue;
        };
        if matches!(x, 'R' | 'C') {
            // Source path follows as its own field.
            fields.next();
        }

        let mut entry = StatusEntry::new(path);
        match (x, y) {
            ('!', '!') => continue,
            ('?', '?') => entry.untracked = true,
            _ if is_unmerged(x, y) => entry.conflicted = true,
            _ => {
                entry.staged = matches!(x, 'M' | 'A' | 'D' | 'R' | 'C' | 'T');
                entry.modified = matches!(y, 'M' | 'D' | 'T' | 'R' | 'C');
            }
        }
        entries.push(entry);
    }

    entries
}

fn is_unmerged(x: char, y: char) -> bool {
    x == 'U' || y == 'U' || (x, y) == ('A', 'A') || (x, y) == ('D', 'D')
}

/// Parse `git diff --numstat -z`, keyed by head-side path.
pub(crate) fn parse_numstat(output: &str) -> HashMap<String, DiffStats> {
    let mut stats = HashMap::new();
    let mut fields = output.split('\0');

    while let Some(field) = fields.next() {
        let mut parts = field.splitn(3, '\t');
        let (Some(added), Some(removed), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let path = if path.is_empty() {
            // Rename or copy: old and new path follow as separate fields.
            let _old = fields.next();
            match fields.next() {
                Some(new) => new,
                None => continue,
            }
        } else {
            path
        };
        stats.insert(
            path.to_owned(),
            DiffStats::new(parse_count(added), parse_count(removed)),
        );
    }

    stats
}

fn parse_count(value: &str) -> u32 {
    // Binary files report "-".
    value.trim().parse().unwrap_or(0)
}

/// Parse `git diff --name-status -z`, attaching counts from `numstat`.
pub(crate) fn parse_name_status(
    output: &str,
    numstat: &HashMap<String, DiffStats>,
) -> Vec<FileChange> {
    let mut changes = Vec::new();
    let mut fields = output.split('\0').filter(|field| !field.is_empty());

    while let Some(code) = fields.next() {
        let mut chars = code.chars();
        let Some(letter) = chars.next() else {
            continue;
        };
        let score: Option<u32> = chars.as_str().parse().ok();

        let (status, old_path, path) = match letter {
            'R' | 'C' => {
                let (Some(old), Some(new)) = (fields.next(), fields.next()) else {
                    break;
                };
                let status = if letter == 'R' {
                    FileStatus::Renamed
                } else {
                    FileStatus::Copied
                };
                (status, Some(old.to_owned()), new)
            }
            'A' | 'D' | 'M' | 'T' => {
                let Some(path) = fields.next() else {
                    break;
                };
                let status = match letter {
                    'A' => FileStatus::Added,
                    'D' => FileStatus::Deleted,
                    _ => FileStatus::Modified,
                };
                (status, None, path)
            }
            _ => {
                // Unmerged or unknown entries carry a single path.
                fields.next();
                continue;
            }
        };

        changes.push(FileChange {
            status,
            path: path.to_owned(),
            old_path,
            stats: numstat.get(path).copied().unwrap_or_default(),
            content_unchanged: score == Some(100),
        });
    }

    changes
}
