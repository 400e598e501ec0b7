//! Blog service contract and the Blogger v3 REST client.
//!
//! Authentication is a bearer OAuth 2.0 access token obtained outside of
//! this tool.

use crate::error::{QuillError, Result};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::info;
use ureq::Agent;

/// Public Blogger API endpoint
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/blogger/v3";

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// A blog owned by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blog {
    pub id: String,
    pub title: String,
}

/// Identifies an existing post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHandle {
    pub blog_id: String,
    pub post_id: String,
}

/// An existing post as listed by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub title: String,
    pub content: String,
    pub updated: String,
    pub draft: bool,
    pub handle: PostHandle,
}

/// What publishing needs from a blogging service
pub trait BlogService {
    fn list_blogs(&self) -> Result<Vec<Blog>>;

    /// Posts of a blog, drafts included; only those titled `title` if given.
    fn list_posts(&self, blog_id: &str, title: Option<&str>) -> Result<Vec<PostSummary>>;

    fn create_post(&self, blog_id: &str, title: &str, html: &str, draft: bool)
    -> Result<PostHandle>;

    /// Changes only what is `Some`.
    fn update_post(
        &self,
        handle: &PostHandle,
        title: Option<&str>,
        html: Option<&str>,
        draft: Option<bool>,
    ) -> Result<PostHandle>;
}

#[derive(Deserialize)]
struct BlogList {
    #[serde(default)]
    items: Vec<WireBlog>,
}

#[derive(Deserialize)]
struct WireBlog {
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostList {
    #[serde(default)]
    items: Vec<WirePost>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct WirePost {
    id: String,
    blog: BlogRef,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    updated: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct BlogRef {
    id: String,
}

impl WirePost {
    fn is_draft(&self) -> bool {
        self.status.as_deref() == Some("DRAFT")
    }

    fn into_summary(self) -> PostSummary {
        let draft = self.is_draft();
        PostSummary {
            title: self.title,
            content: self.content,
            updated: self.updated,
            draft,
            handle: PostHandle {
                blog_id: self.blog.id,
                post_id: self.id,
            },
        }
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// Blogger v3 REST client.
pub struct BloggerClient {
    agent: Agent,
    base_url: String,
    user: String,
    token: String,
}

impl BloggerClient {
    /// Client for the public API. `user` defaults to `self`, the owner of
    /// the token.
    #[must_use]
    pub fn new(token: &str, user: Option<&str>) -> Self {
        Self::with_base_url(DEFAULT_API_URL, token, user)
    }

    #[must_use]
    pub fn with_base_url(base_url: &str, token: &str, user: Option<&str>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            user: user.unwrap_or("self").to_owned(),
            token: token.to_owned(),
        }
    }

    fn post_url(&self, handle: &PostHandle) -> String {
        format!(
            "{}/blogs/{}/posts/{}",
            self.base_url,
            encode(&handle.blog_id),
            encode(&handle.post_id)
        )
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .agent
            .get(url)
            .header("Authorization", &self.auth_header())
            .header("Accept", "application/json")
            .call()?;
        read_response(response)
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<T> {
        let request = self
            .agent
            .post(url)
            .header("Authorization", &self.auth_header())
            .header("Accept", "application/json");
        let response = match payload {
            Some(payload) => request
                .header("Content-Type", "application/json")
                .send(&serde_json::to_vec(payload)?[..])?,
            None => request.send_empty()?,
        };
        read_response(response)
    }

    fn patch_json<T: DeserializeOwned>(&self, url: &str, payload: &serde_json::Value) -> Result<T> {
        let response = self
            .agent
            .patch(url)
            .header("Authorization", &self.auth_header())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .send(&serde_json::to_vec(payload)?[..])?;
        read_response(response)
    }
}

fn read_response<T: DeserializeOwned>(response: ureq::http::Response<ureq::Body>) -> Result<T> {
    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let body = body
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_string());
        return Err(QuillError::HttpResponse { status, body });
    }

    Ok(body.read_json()?)
}

impl BlogService for BloggerClient {
    fn list_blogs(&self) -> Result<Vec<Blog>> {
        let url = format!("{}/users/{}/blogs", self.base_url, encode(&self.user));
        info!("Listing blogs of user {}", self.user);

        let blogs: BlogList = self.get_json(&url)?;
        Ok(blogs
            .items
            .into_iter()
            .map(|blog| Blog {
                id: blog.id,
                title: blog.name,
            })
            .collect())
    }

    fn list_posts(&self, blog_id: &str, title: Option<&str>) -> Result<Vec<PostSummary>> {
        let base = format!(
            "{}/blogs/{}/posts?fetchBodies=true&view=AUTHOR&status=live&status=draft&status=scheduled",
            self.base_url,
            encode(blog_id)
        );
        info!("Listing posts of blog {}", blog_id);

        let mut posts = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let url = match &page_token {
                Some(token) => format!("{base}&pageToken={}", encode(token)),
                None => base.clone(),
            };
            let page: PostList = self.get_json(&url)?;
            posts.extend(
                page.items
                    .into_iter()
                    .filter(|post| title.is_none_or(|t| post.title == t))
                    .map(WirePost::into_summary),
            );
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(posts)
    }

    fn create_post(
        &self,
        blog_id: &str,
        title: &str,
        html: &str,
        draft: bool,
    ) -> Result<PostHandle> {
        let url = format!(
            "{}/blogs/{}/posts?isDraft={draft}",
            self.base_url,
            encode(blog_id)
        );
        info!("Creating post \"{}\" in blog {} (draft: {})", title, blog_id, draft);

        let payload = json!({
            "kind": "blogger#post",
            "title": title,
            "content": html,
        });
        let post: WirePost = self.post_json(&url, Some(&payload))?;
        Ok(post.into_summary().handle)
    }

    fn update_post(
        &self,
        handle: &PostHandle,
        title: Option<&str>,
        html: Option<&str>,
        draft: Option<bool>,
    ) -> Result<PostHandle> {
        let url = self.post_url(handle);

        let mut payload = json!({});
        if let Some(title) = title {
            payload["title"] = json!(title);
        }
        if let Some(html) = html {
            payload["content"] = json!(html);
        }

        let post: WirePost = if title.is_some() || html.is_some() {
            info!("Updating post {} in blog {}", handle.post_id, handle.blog_id);
            self.patch_json(&url, &payload)?
        } else {
            self.get_json(&format!("{url}?view=AUTHOR"))?
        };

        if let Some(draft) = draft
            && draft != post.is_draft()
        {
            let action = if draft { "revert" } else { "publish" };
            info!("Switching post {} with `{}`", handle.post_id, action);
            let _: WirePost = self.post_json(&format!("{url}/{action}"), None)?;
        }

        Ok(handle.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[derive(Debug)]
    struct Seen {
        line: String,
        body: String,
    }

    /// Serves one canned JSON response per connection and returns the
    /// requests it saw.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, thread::JoinHandle<Vec<Seen>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();

                let mut content_length = 0;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header == "\r\n" || header.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = header.split_once(':')
                        && name.eq_ignore_ascii_case("content-length")
                    {
                        content_length = value.trim().parse().unwrap();
                    }
                }
                let mut request_body = vec![0; content_length];
                reader.read_exact(&mut request_body).unwrap();
                seen.push(Seen {
                    line: request_line.trim_end().to_string(),
                    body: String::from_utf8(request_body).unwrap(),
                });

                let mut stream = stream;
                write!(
                    stream,
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                )
                .unwrap();
            }
            seen
        });

        (base_url, handle)
    }

    fn lines(seen: &[Seen]) -> Vec<&str> {
        seen.iter().map(|s| s.line.as_str()).collect()
    }

    fn handle() -> PostHandle {
        PostHandle {
            blog_id: "1".to_string(),
            post_id: "p".to_string(),
        }
    }

    const DRAFT_POST: &str = r#"{"id":"p","blog":{"id":"1"},"title":"T","status":"DRAFT"}"#;
    const LIVE_POST: &str = r#"{"id":"p","blog":{"id":"1"},"title":"T","status":"LIVE"}"#;

    #[test]
    fn test_wire_post_conversion() {
        let post: WirePost = serde_json::from_str(
            r#"{"id":"42","blog":{"id":"7"},"title":"Hello","content":"<p>x</p>","updated":"2024-01-01T00:00:00Z","status":"DRAFT","kind":"blogger#post"}"#,
        )
        .unwrap();
        let summary = post.into_summary();
        assert_eq!(summary.title, "Hello");
        assert!(summary.draft);
        assert_eq!(
            summary.handle,
            PostHandle {
                blog_id: "7".to_string(),
                post_id: "42".to_string()
            }
        );
    }

    #[test]
    fn test_empty_lists_have_no_items() {
        let blogs: BlogList = serde_json::from_str(r#"{"kind":"blogger#blogList"}"#).unwrap();
        assert!(blogs.items.is_empty());
        let posts: PostList = serde_json::from_str(r#"{"kind":"blogger#postList"}"#).unwrap();
        assert!(posts.items.is_empty());
        assert_eq!(posts.next_page_token, None);
    }

    #[test]
    fn test_list_blogs() {
        let (base_url, server) = serve(vec![(
            200,
            r#"{"items":[{"id":"1","name":"Notes"},{"id":"2","name":"Travel"}]}"#,
        )]);
        let client = BloggerClient::with_base_url(&base_url, "token", Some("123"));

        let blogs = client.list_blogs().unwrap();
        assert_eq!(
            blogs,
            vec![
                Blog {
                    id: "1".to_string(),
                    title: "Notes".to_string()
                },
                Blog {
                    id: "2".to_string(),
                    title: "Travel".to_string()
                },
            ]
        );

        let seen = server.join().unwrap();
        assert_eq!(lines(&seen), vec!["GET /users/123/blogs HTTP/1.1"]);
    }

    #[test]
    fn test_list_posts_follows_pages_and_filters() {
        let (base_url, server) = serve(vec![
            (
                200,
                r#"{"items":[{"id":"a","blog":{"id":"1"},"title":"Hello"},{"id":"b","blog":{"id":"1"},"title":"Other"}],"nextPageToken":"p/2"}"#,
            ),
            (
                200,
                r#"{"items":[{"id":"c","blog":{"id":"1"},"title":"Hello","status":"LIVE"}]}"#,
            ),
        ]);
        let client = BloggerClient::with_base_url(&base_url, "token", None);

        let posts = client.list_posts("1", Some("Hello")).unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.handle.post_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].line.contains("pageToken=p%2F2"));
    }

    #[test]
    fn test_error_status() {
        let (base_url, server) = serve(vec![(403, r#"{"error":"forbidden"}"#)]);
        let client = BloggerClient::with_base_url(&base_url, "bad", None);

        let err = client.list_blogs().unwrap_err();
        match err {
            QuillError::HttpResponse { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("forbidden"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_create_post() {
        let (base_url, server) = serve(vec![(200, r#"{"id":"new","blog":{"id":"1"}}"#)]);
        let client = BloggerClient::with_base_url(&base_url, "token", None);

        let handle = client.create_post("1", "Hello", "<p>hi</p>", true).unwrap();
        assert_eq!(handle.post_id, "new");

        let seen = server.join().unwrap();
        assert_eq!(lines(&seen), vec!["POST /blogs/1/posts?isDraft=true HTTP/1.1"]);
        let payload: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(payload["title"], "Hello");
        assert_eq!(payload["content"], "<p>hi</p>");
    }

    #[test]
    fn test_update_sends_only_given_fields() {
        let (base_url, server) = serve(vec![(200, LIVE_POST)]);
        let client = BloggerClient::with_base_url(&base_url, "token", None);

        client.update_post(&handle(), Some("T"), None, None).unwrap();

        let seen = server.join().unwrap();
        assert_eq!(lines(&seen), vec!["PATCH /blogs/1/posts/p HTTP/1.1"]);
        let payload: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(payload, json!({ "title": "T" }));
    }

    #[test]
    fn test_update_publishes_draft() {
        let (base_url, server) = serve(vec![(200, DRAFT_POST), (200, LIVE_POST)]);
        let client = BloggerClient::with_base_url(&base_url, "token", None);

        client
            .update_post(&handle(), Some("T"), Some("<p>new</p>"), Some(false))
            .unwrap();

        let seen = server.join().unwrap();
        assert_eq!(
            lines(&seen),
            vec![
                "PATCH /blogs/1/posts/p HTTP/1.1",
                "POST /blogs/1/posts/p/publish HTTP/1.1",
            ]
        );
    }

    #[test]
    fn test_update_keeps_matching_draft_state() {
        let (base_url, server) = serve(vec![(200, LIVE_POST)]);
        let client = BloggerClient::with_base_url(&base_url, "token", None);

        client
            .update_post(&handle(), None, Some("<p>new</p>"), Some(false))
            .unwrap();

        let seen = server.join().unwrap();
        assert_eq!(lines(&seen), vec!["PATCH /blogs/1/posts/p HTTP/1.1"]);
    }

    #[test]
    fn test_draft_only_update_reads_then_reverts() {
        let (base_url, server) = serve(vec![(200, LIVE_POST), (200, DRAFT_POST)]);
        let client = BloggerClient::with_base_url(&base_url, "token", None);

        client.update_post(&handle(), None, None, Some(true)).unwrap();

        let seen = server.join().unwrap();
        assert_eq!(
            lines(&seen),
            vec![
                "GET /blogs/1/posts/p?view=AUTHOR HTTP/1.1",
                "POST /blogs/1/posts/p/revert HTTP/1.1",
            ]
        );
        assert!(seen[1].body.is_empty());
    }
}
