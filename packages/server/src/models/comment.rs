use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    #[schema(example = "Tried this with lime instead, great!")]
    pub content: String,
    /// Comment being replied to; must belong to the same recipe.
    pub parent_id: Option<i32>,
}

pub fn validate_create_comment(payload: &CreateCommentRequest) -> Result<(), AppError> {
    let content = payload.content.trim();
    if content.is_empty() || content.chars().count() > 5000 {
        return Err(AppError::Validation(
            "Content must be 1-5000 characters".into(),
        ));
    }
    Ok(())
}

/// Flat comment row joined with its author's username.
#[derive(Clone, Debug)]
pub struct CommentRow {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub author_id: i32,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, utoipa::ToSchema)]
#[schema(no_recursion)]
pub struct CommentNode {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub author_id: i32,
    #[schema(example = "alice_cooks")]
    pub author: String,
    pub content: String,
    /// 0 for top-level comments.
    pub depth: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Direct replies, oldest first.
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(row: CommentRow, depth: u32) -> Self {
        Self {
            id: row.id,
            parent_id: row.parent_id,
            author_id: row.author_id,
            author: row.author,
            content: row.content,
            depth,
            created_at: row.created_at,
            updated_at: row.updated_at,
            replies: Vec::new(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentTreeResponse {
    pub data: Vec<CommentNode>,
    /// Number of comments in the whole tree.
    pub total: usize,
}

/// Group rows into reply trees.
///
/// Siblings keep their input order, so rows are expected sorted by
/// `created_at`. A row whose parent is absent is treated as a root.
pub fn build_comment_tree(rows: Vec<CommentRow>) -> Vec<CommentNode> {
    let ids: HashSet<i32> = rows.iter().map(|r| r.id).collect();
    let mut children: HashMap<Option<i32>, Vec<CommentRow>> = HashMap::new();
    for row in rows {
        let key = row.parent_id.filter(|p| ids.contains(p));
        children.entry(key).or_default().push(row);
    }

    fn attach(
        parent: Option<i32>,
        depth: u32,
        children: &mut HashMap<Option<i32>, Vec<CommentRow>>,
    ) -> Vec<CommentNode> {
        let Some(rows) = children.remove(&parent) else {
            return Vec::new();
        };
        rows.into_iter()
            .map(|row| {
                let id = row.id;
                let mut node = CommentNode::leaf(row, depth);
                node.replies = attach(Some(id), depth + 1, children);
                node
            })
            .collect()
    }

    attach(None, 0, &mut children)
}
