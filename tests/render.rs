//! Template rendering tests (no infrastructure needed)

use time::OffsetDateTime;
use uuid::Uuid;

use yatube::app::forms::FormErrors;
use yatube::app::pagination::{Page, PageRequest, POSTS_PER_PAGE};
use yatube::domain::group::GroupRef;
use yatube::domain::ownership::Owned;
use yatube::domain::post::Post;
use yatube::http::AuthUser;
use yatube::render::html::{display_date, escape, linebreaksbr};
use yatube::render::pages::{IndexPage, PostDetailPage, PostFormPage};
use yatube::render::{render, RenderContext};

const MEDIA: &str = "http://media.test/bucket";

fn post_by(author: &AuthUser, text: &str) -> Post {
    Post {
        id: Uuid::new_v4(),
        author_id: author.user_id,
        author_username: author.username.clone(),
        group: Some(GroupRef {
            id: Uuid::new_v4(),
            slug: "cats".to_string(),
            title: "Cats & co".to_string(),
        }),
        text: text.to_string(),
        image_key: Some("posts/pic.png".to_string()),
        created_at: OffsetDateTime::from_unix_timestamp(1_791_936_000).unwrap(),
    }
}

fn viewer(name: &str) -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        username: name.to_string(),
    }
}

fn single_page(posts: Vec<Post>, total: i64, number: i64) -> Page<Post> {
    Page::new(posts, PageRequest::new(number).resolve(total, POSTS_PER_PAGE), total)
}

#[test]
fn escaping_and_line_breaks() {
    assert_eq!(escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;");
    assert_eq!(linebreaksbr("one\r\ntwo\n<b>"), "one<br>two<br>&lt;b&gt;");
}

#[test]
fn dates_read_naturally() {
    let ts = OffsetDateTime::from_unix_timestamp(1_791_936_000).unwrap();
    assert_eq!(display_date(ts), "14 October 2026");
}

#[test]
fn index_marks_template_and_lists_cards() {
    let author = viewer("writer");
    let post = post_by(&author, "Hello <world>");
    let page = single_page(vec![post.clone()], 1, 1);

    let html = render(&IndexPage { page: &page }, &RenderContext::new(None, MEDIA)).unwrap();

    assert!(html.contains("<body data-template=\"posts/index.html\">"));
    assert!(html.contains(&format!("data-post-id=\"{}\"", post.id)));
    assert!(html.contains("Hello &lt;world&gt;"));
    assert!(html.contains("src=\"http://media.test/bucket/posts/pic.png\""));
    assert!(html.contains("All posts of the group Cats &amp; co"));
    assert!(html.contains("href=\"/auth/login/\""));
    assert!(!html.contains("class=\"pagination\""));
}

#[test]
fn paginator_links_neighbours() {
    let page = single_page(Vec::new(), 35, 2);

    let html = render(&IndexPage { page: &page }, &RenderContext::new(None, MEDIA)).unwrap();

    assert!(html.contains("href=\"?page=1\""));
    assert!(html.contains("href=\"?page=3\""));
    assert!(html.contains("href=\"?page=4\""));
    assert!(html.contains("aria-current=\"page\">2<"));
}

#[test]
fn navigation_depends_on_viewer() {
    let reader = viewer("reader");
    let page = single_page(Vec::new(), 0, 1);

    let html = render(&IndexPage { page: &page }, &RenderContext::new(Some(&reader), MEDIA)).unwrap();

    assert!(html.contains("href=\"/profile/reader/\""));
    assert!(html.contains("href=\"/auth/logout/\""));
    assert!(!html.contains("href=\"/auth/signup/\""));
}

#[test]
fn detail_shows_owner_controls_only_to_author() {
    let author = viewer("owner");
    let stranger = viewer("stranger");
    let post = post_by(&author, "Mine");
    assert!(post.is_owned_by(author.user_id));
    assert!(!post.is_owned_by(stranger.user_id));

    let page = PostDetailPage {
        post: &post,
        author_post_count: 4,
        comments: &[],
        comment_error: None,
    };

    let as_author = render(&page, &RenderContext::new(Some(&author), MEDIA)).unwrap();
    assert!(as_author.contains("/edit/"));
    assert!(as_author.contains("comment-form"));

    let as_stranger = render(&page, &RenderContext::new(Some(&stranger), MEDIA)).unwrap();
    assert!(!as_stranger.contains("/edit/"));
    assert!(as_stranger.contains("comment-form"));

    let anonymous = render(&page, &RenderContext::new(None, MEDIA)).unwrap();
    assert!(!anonymous.contains("comment-form"));
    assert!(anonymous.contains("data-post-count=\"4\""));
}

#[test]
fn post_form_keeps_submitted_values_and_errors() {
    let author = viewer("editor");
    let mut errors = FormErrors::new();
    errors.add("text", "This field must not be empty.");
    let page = PostFormPage {
        editing: None,
        text: "draft <text>",
        selected_group: None,
        groups: &[],
        current_image: None,
        errors: &errors,
    };

    let html = render(&page, &RenderContext::new(Some(&author), MEDIA)).unwrap();

    assert!(html.contains("data-template=\"posts/create_post.html\""));
    assert!(html.contains("draft &lt;text&gt;"));
    assert!(html.contains("<ul class=\"errorlist\" data-field=\"text\">"));
    assert!(html.contains("action=\"/create/\""));
}
