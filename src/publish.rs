//! Create-or-update of a rendered post on a blog service.

use crate::assemble::RenderedArtifact;
use crate::blogger::{Blog, BlogService, PostHandle};
use crate::error::{QuillError, Result};
use tracing::debug;

/// What to do with a rendered post
#[derive(Debug, Clone, Copy)]
pub struct PublishOptions<'a> {
    /// Title of the destination blog
    pub blog: &'a str,
    pub draft: bool,
    /// Replace a single existing post with the same title
    pub update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Created(PostHandle),
    Updated(PostHandle),
}

/// Finds a blog by its title.
///
/// # Errors
///
/// Returns `QuillError::BlogNotFound` if no blog has that title.
pub fn find_blog<S: BlogService + ?Sized>(service: &S, title: &str) -> Result<Blog> {
    service
        .list_blogs()?
        .into_iter()
        .find(|blog| blog.title == title)
        .ok_or_else(|| QuillError::BlogNotFound {
            title: title.to_string(),
        })
}

/// What [`publish`] is about to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishAction {
    Create { blog_id: String },
    Update(PostHandle),
}

/// Decides between creating a post titled `title` and updating the one
/// that already carries it.
///
/// # Errors
///
/// - `QuillError::BlogNotFound` if the blog doesn't exist.
/// - `QuillError::DuplicatePost` if posts with the title exist and updating
///   isn't allowed, or more than one exists.
/// - Service errors.
pub fn plan<S: BlogService + ?Sized>(
    service: &S,
    title: &str,
    options: PublishOptions<'_>,
) -> Result<PublishAction> {
    let blog = find_blog(service, options.blog)?;
    let existing = service.list_posts(&blog.id, Some(title))?;
    debug!(blog = %blog.id, title, existing = existing.len(), "checked for existing posts");

    match existing.as_slice() {
        [] => Ok(PublishAction::Create { blog_id: blog.id }),
        [post] if options.update => Ok(PublishAction::Update(post.handle.clone())),
        posts => Err(QuillError::DuplicatePost {
            title: title.to_string(),
            count: posts.len(),
        }),
    }
}

/// Carries out a planned action for `artifact`.
///
/// # Errors
///
/// `QuillError::MissingTitle` if the artifact has no title, or service
/// errors.
pub fn apply<S: BlogService + ?Sized>(
    service: &S,
    action: PublishAction,
    artifact: &RenderedArtifact,
    draft: bool,
) -> Result<PublishOutcome> {
    let title = artifact.title().ok_or(QuillError::MissingTitle)?;
    match action {
        PublishAction::Create { blog_id } => service
            .create_post(&blog_id, title, &artifact.body, draft)
            .map(PublishOutcome::Created),
        PublishAction::Update(handle) => service
            .update_post(&handle, Some(title), Some(&artifact.body), Some(draft))
            .map(PublishOutcome::Updated),
    }
}

/// Posts `artifact`, or updates the one post that already carries its title
/// when `options.update` is set.
///
/// # Errors
///
/// `QuillError::MissingTitle` if the artifact has no title, otherwise the
/// errors of [`plan`] and [`apply`].
pub fn publish<S: BlogService + ?Sized>(
    service: &S,
    artifact: &RenderedArtifact,
    options: PublishOptions<'_>,
) -> Result<PublishOutcome> {
    let title = artifact.title().ok_or(QuillError::MissingTitle)?;
    let action = plan(service, title, options)?;
    apply(service, action, artifact, options.draft)
}
