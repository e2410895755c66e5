use std::fmt::{self, Write};

use uuid::Uuid;

use crate::app::forms::{FormErrors, NON_FIELD};
use crate::app::pagination::Page;
use crate::domain::comment::Comment;
use crate::domain::group::Group;
use crate::domain::post::Post;
use crate::domain::user::User;
use crate::render::html::{datetime_attr, display_date, linebreaksbr, Escaped};
use crate::render::{RenderContext, Template};

pub struct IndexPage<'a> {
    pub page: &'a Page<Post>,
}

impl Template for IndexPage<'_> {
    fn name(&self) -> &'static str {
        "posts/index.html"
    }

    fn title(&self) -> String {
        "Latest updates".to_string()
    }

    fn write_body(&self, ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        out.push_str("<h1>Latest updates</h1>\n");
        write_post_list(ctx, out, self.page, PostLinks::All)?;
        write_paginator(out, self.page)
    }
}

pub struct GroupPage<'a> {
    pub group: &'a Group,
    pub page: &'a Page<Post>,
}

impl Template for GroupPage<'_> {
    fn name(&self) -> &'static str {
        "posts/group_list.html"
    }

    fn title(&self) -> String {
        format!("Posts of the group {}", self.group.title)
    }

    fn write_body(&self, ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        writeln!(out, "<h1>{}</h1>", Escaped(&self.group.title))?;
        writeln!(
            out,
            "<p class=\"group-description\">{}</p>",
            linebreaksbr(&self.group.description)
        )?;
        write_post_list(ctx, out, self.page, PostLinks::WithoutGroup)?;
        write_paginator(out, self.page)
    }
}

pub struct ProfilePage<'a> {
    pub author: &'a User,
    pub page: &'a Page<Post>,
    pub post_count: i64,
    pub following: bool,
}

impl Template for ProfilePage<'_> {
    fn name(&self) -> &'static str {
        "posts/profile.html"
    }

    fn title(&self) -> String {
        format!("Profile of {}", self.author.username)
    }

    fn write_body(&self, ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        let username = Escaped(&self.author.username);
        writeln!(out, "<h1>All posts of {}</h1>", username)?;
        writeln!(
            out,
            "<p class=\"post-count\" data-post-count=\"{0}\">Posts: {0}</p>",
            self.post_count
        )?;

        let is_self = ctx.viewer_id() == Some(self.author.id);
        if ctx.viewer.is_some() && !is_self {
            if self.following {
                writeln!(
                    out,
                    "<a class=\"btn unfollow\" data-following=\"true\" href=\"/profile/{}/unfollow/\">Unfollow</a>",
                    username
                )?;
            } else {
                writeln!(
                    out,
                    "<a class=\"btn follow\" data-following=\"false\" href=\"/profile/{}/follow/\">Follow</a>",
                    username
                )?;
            }
        }

        write_post_list(ctx, out, self.page, PostLinks::All)?;
        write_paginator(out, self.page)
    }
}

pub struct PostDetailPage<'a> {
    pub post: &'a Post,
    pub author_post_count: i64,
    pub comments: &'a [Comment],
    pub comment_error: Option<&'a str>,
}

impl Template for PostDetailPage<'_> {
    fn name(&self) -> &'static str {
        "posts/post_detail.html"
    }

    fn title(&self) -> String {
        let preview: String = self.post.text.chars().take(30).collect();
        format!("Post {}", preview)
    }

    fn write_body(&self, ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        let post = self.post;
        writeln!(out, "<article class=\"post-detail\" data-post-id=\"{}\">", post.id)?;
        out.push_str("<aside class=\"post-meta\">\n<ul>\n");
        writeln!(
            out,
            "<li>Date: <time datetime=\"{}\">{}</time></li>",
            datetime_attr(post.created_at),
            display_date(post.created_at)
        )?;
        if let Some(group) = &post.group {
            writeln!(
                out,
                "<li>Group: <a href=\"/group/{}/\">{}</a></li>",
                Escaped(&group.slug),
                Escaped(&group.title)
            )?;
        }
        writeln!(
            out,
            "<li>Author: <a href=\"/profile/{0}/\">{0}</a></li>",
            Escaped(&post.author_username)
        )?;
        writeln!(
            out,
            "<li class=\"author-post-count\" data-post-count=\"{0}\">Author's posts: {0}</li>",
            self.author_post_count
        )?;
        out.push_str("</ul>\n</aside>\n");

        write_image(ctx, out, post)?;
        writeln!(out, "<p class=\"post-text\">{}</p>", linebreaksbr(&post.text))?;

        if ctx.viewer_id() == Some(post.author_id) {
            writeln!(
                out,
                "<a class=\"btn edit\" href=\"/posts/{0}/edit/\">Edit post</a>\n\
                 <form class=\"delete\" method=\"post\" action=\"/posts/{0}/delete/\">\
                 <button type=\"submit\">Delete post</button></form>",
                post.id
            )?;
        }
        out.push_str("</article>\n");

        self.write_comments(ctx, out)
    }
}

impl PostDetailPage<'_> {
    fn write_comments(&self, ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        out.push_str("<section class=\"comments\">\n");
        if ctx.viewer.is_some() {
            writeln!(
                out,
                "<form class=\"comment-form\" method=\"post\" action=\"/posts/{}/comment/\">",
                self.post.id
            )?;
            out.push_str("<label for=\"id_text\">Add a comment</label>\n");
            if let Some(message) = self.comment_error {
                writeln!(out, "<ul class=\"errorlist\"><li>{}</li></ul>", Escaped(message))?;
            }
            out.push_str(
                "<textarea name=\"text\" id=\"id_text\" required></textarea>\n\
                 <button type=\"submit\">Send</button>\n</form>\n",
            );
        }

        for comment in self.comments {
            writeln!(out, "<div class=\"comment\" data-comment-id=\"{}\">", comment.id)?;
            writeln!(
                out,
                "<h5><a href=\"/profile/{0}/\">{0}</a> <time datetime=\"{1}\">{2}</time></h5>",
                Escaped(&comment.author_username),
                datetime_attr(comment.created_at),
                display_date(comment.created_at)
            )?;
            writeln!(out, "<p>{}</p>\n</div>", linebreaksbr(&comment.text))?;
        }
        out.push_str("</section>\n");
        Ok(())
    }
}

/// Shared by create and edit.
pub struct PostFormPage<'a> {
    pub editing: Option<Uuid>,
    pub text: &'a str,
    pub selected_group: Option<&'a str>,
    pub groups: &'a [Group],
    pub current_image: Option<&'a str>,
    pub errors: &'a FormErrors,
}

impl Template for PostFormPage<'_> {
    fn name(&self) -> &'static str {
        "posts/create_post.html"
    }

    fn title(&self) -> String {
        match self.editing {
            Some(_) => "Edit post".to_string(),
            None => "New post".to_string(),
        }
    }

    fn write_body(&self, ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        let action = match self.editing {
            Some(post_id) => format!("/posts/{}/edit/", post_id),
            None => "/create/".to_string(),
        };
        writeln!(out, "<h1>{}</h1>", Escaped(&self.title()))?;
        writeln!(
            out,
            "<form class=\"post-form\" method=\"post\" enctype=\"multipart/form-data\" action=\"{}\">",
            action
        )?;
        write_errors(out, self.errors, NON_FIELD)?;

        out.push_str("<div class=\"field\">\n<label for=\"id_text\">Post text</label>\n");
        write_errors(out, self.errors, "text")?;
        writeln!(
            out,
            "<textarea name=\"text\" id=\"id_text\" rows=\"10\" required>{}</textarea>",
            Escaped(self.text)
        )?;
        out.push_str("<small>The text of the new post goes here.</small>\n</div>\n");

        out.push_str("<div class=\"field\">\n<label for=\"id_group\">Group</label>\n");
        write_errors(out, self.errors, "group")?;
        out.push_str("<select name=\"group\" id=\"id_group\">\n<option value=\"\">---------</option>\n");
        for group in self.groups {
            let id = group.id.to_string();
            let selected = if self.selected_group == Some(id.as_str()) {
                " selected"
            } else {
                ""
            };
            writeln!(
                out,
                "<option value=\"{}\"{}>{}</option>",
                id,
                selected,
                Escaped(&group.title)
            )?;
        }
        out.push_str("</select>\n<small>Group the post belongs to.</small>\n</div>\n");

        out.push_str("<div class=\"field\">\n<label for=\"id_image\">Image</label>\n");
        write_errors(out, self.errors, "image")?;
        if let Some(key) = self.current_image {
            writeln!(
                out,
                "<p class=\"current-image\">Currently: <a href=\"{0}\">{0}</a> \
                 <input type=\"checkbox\" name=\"image-clear\" id=\"image-clear_id\">\
                 <label for=\"image-clear_id\">Clear</label></p>",
                Escaped(&ctx.image_url(key))
            )?;
        }
        out.push_str("<input type=\"file\" name=\"image\" id=\"id_image\" accept=\"image/*\">\n</div>\n");

        let submit = if self.editing.is_some() { "Save" } else { "Add" };
        writeln!(out, "<button type=\"submit\">{}</button>\n</form>", submit)
    }
}

pub struct FollowPage<'a> {
    pub page: &'a Page<Post>,
}

impl Template for FollowPage<'_> {
    fn name(&self) -> &'static str {
        "posts/follow.html"
    }

    fn title(&self) -> String {
        "Posts of followed authors".to_string()
    }

    fn write_body(&self, ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        out.push_str("<h1>Posts of followed authors</h1>\n");
        write_post_list(ctx, out, self.page, PostLinks::All)?;
        write_paginator(out, self.page)
    }
}

pub struct LoginPage<'a> {
    pub username: &'a str,
    pub next: Option<&'a str>,
    pub errors: &'a FormErrors,
}

impl Template for LoginPage<'_> {
    fn name(&self) -> &'static str {
        "users/login.html"
    }

    fn title(&self) -> String {
        "Log in".to_string()
    }

    fn write_body(&self, _ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        out.push_str("<h1>Log in</h1>\n<form class=\"login-form\" method=\"post\" action=\"/auth/login/\">\n");
        write_errors(out, self.errors, NON_FIELD)?;
        if let Some(next) = self.next {
            writeln!(out, "<input type=\"hidden\" name=\"next\" value=\"{}\">", Escaped(next))?;
        }
        text_input(out, "username", "Username", "text", self.username, self.errors)?;
        text_input(out, "password", "Password", "password", "", self.errors)?;
        out.push_str("<button type=\"submit\">Log in</button>\n</form>\n");
        Ok(())
    }
}

pub struct SignupPage<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub errors: &'a FormErrors,
}

impl Template for SignupPage<'_> {
    fn name(&self) -> &'static str {
        "users/signup.html"
    }

    fn title(&self) -> String {
        "Sign up".to_string()
    }

    fn write_body(&self, _ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        out.push_str("<h1>Sign up</h1>\n<form class=\"signup-form\" method=\"post\" action=\"/auth/signup/\">\n");
        write_errors(out, self.errors, NON_FIELD)?;
        text_input(out, "username", "Username", "text", self.username, self.errors)?;
        text_input(out, "email", "Email address", "email", self.email, self.errors)?;
        text_input(out, "password1", "Password", "password", "", self.errors)?;
        text_input(out, "password2", "Password confirmation", "password", "", self.errors)?;
        out.push_str("<button type=\"submit\">Sign up</button>\n</form>\n");
        Ok(())
    }
}

pub struct LoggedOutPage;

impl Template for LoggedOutPage {
    fn name(&self) -> &'static str {
        "users/logged_out.html"
    }

    fn title(&self) -> String {
        "Logged out".to_string()
    }

    fn write_body(&self, _ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        out.push_str(
            "<h1>You have logged out</h1>\n<p><a href=\"/auth/login/\">Log in again</a></p>\n",
        );
        Ok(())
    }
}

pub struct ErrorPage<'a> {
    pub status: u16,
    pub message: &'a str,
}

impl Template for ErrorPage<'_> {
    fn name(&self) -> &'static str {
        match self.status {
            403 => "core/403.html",
            404 => "core/404.html",
            500..=599 => "core/500.html",
            _ => "core/error.html",
        }
    }

    fn title(&self) -> String {
        match self.status {
            404 => "Page not found".to_string(),
            500..=599 => "Server error".to_string(),
            status => format!("Error {}", status),
        }
    }

    fn write_body(&self, _ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
        writeln!(
            out,
            "<section class=\"error\" data-status=\"{}\">\n<h1>{}</h1>\n<p>{}</p>\n\
             <a href=\"/\">Back to the home page</a>\n</section>",
            self.status,
            Escaped(&self.title()),
            Escaped(self.message)
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PostLinks {
    All,
    /// Listing already scoped to one group.
    WithoutGroup,
}

fn write_post_list(
    ctx: &RenderContext<'_>,
    out: &mut String,
    page: &Page<Post>,
    links: PostLinks,
) -> fmt::Result {
    if page.items.is_empty() {
        out.push_str("<p class=\"empty\">No posts yet.</p>\n");
        return Ok(());
    }
    for (index, post) in page.items.iter().enumerate() {
        if index > 0 {
            out.push_str("<hr>\n");
        }
        write_post_card(ctx, out, post, links)?;
    }
    Ok(())
}

fn write_post_card(
    ctx: &RenderContext<'_>,
    out: &mut String,
    post: &Post,
    links: PostLinks,
) -> fmt::Result {
    writeln!(out, "<article class=\"post\" data-post-id=\"{}\">", post.id)?;
    writeln!(
        out,
        "<ul class=\"post-meta\">\n<li>Author: <a href=\"/profile/{0}/\">{0}</a></li>\n\
         <li>Date: <time datetime=\"{1}\">{2}</time></li>\n</ul>",
        Escaped(&post.author_username),
        datetime_attr(post.created_at),
        display_date(post.created_at)
    )?;
    write_image(ctx, out, post)?;
    writeln!(out, "<p class=\"post-text\">{}</p>", linebreaksbr(&post.text))?;
    writeln!(out, "<a class=\"post-link\" href=\"/posts/{}/\">Details</a>", post.id)?;
    if let (PostLinks::All, Some(group)) = (links, &post.group) {
        writeln!(
            out,
            "<a class=\"group-link\" href=\"/group/{}/\">All posts of the group {}</a>",
            Escaped(&group.slug),
            Escaped(&group.title)
        )?;
    }
    out.push_str("</article>\n");
    Ok(())
}

fn write_image(ctx: &RenderContext<'_>, out: &mut String, post: &Post) -> fmt::Result {
    if let Some(key) = &post.image_key {
        writeln!(
            out,
            "<img class=\"post-image\" src=\"{}\" alt=\"\">",
            Escaped(&ctx.image_url(key))
        )?;
    }
    Ok(())
}

fn write_paginator<T>(out: &mut String, page: &Page<T>) -> fmt::Result {
    if page.num_pages <= 1 {
        return Ok(());
    }
    out.push_str("<nav class=\"pagination\">\n");
    if let Some(previous) = page.previous_number() {
        out.push_str("<a href=\"?page=1\">First</a>\n");
        writeln!(out, "<a href=\"?page={}\">Previous</a>", previous)?;
    }
    for number in 1..=page.num_pages {
        if number == page.number {
            writeln!(out, "<span class=\"current\" aria-current=\"page\">{}</span>", number)?;
        } else if (number - page.number).abs() <= 3 {
            writeln!(out, "<a href=\"?page={0}\">{0}</a>", number)?;
        }
    }
    if let Some(next) = page.next_number() {
        writeln!(out, "<a href=\"?page={}\">Next</a>", next)?;
        writeln!(out, "<a href=\"?page={}\">Last</a>", page.num_pages)?;
    }
    out.push_str("</nav>\n");
    Ok(())
}

fn write_errors(out: &mut String, errors: &FormErrors, field: &str) -> fmt::Result {
    if !errors.has(field) {
        return Ok(());
    }
    writeln!(out, "<ul class=\"errorlist\" data-field=\"{}\">", Escaped(field))?;
    for message in errors.for_field(field) {
        writeln!(out, "<li>{}</li>", Escaped(message))?;
    }
    out.push_str("</ul>\n");
    Ok(())
}

fn text_input(
    out: &mut String,
    name: &str,
    label: &str,
    kind: &str,
    value: &str,
    errors: &FormErrors,
) -> fmt::Result {
    writeln!(
        out,
        "<div class=\"field\">\n<label for=\"id_{0}\">{1}</label>",
        name, label
    )?;
    write_errors(out, errors, name)?;
    writeln!(
        out,
        "<input type=\"{}\" name=\"{1}\" id=\"id_{1}\" value=\"{2}\">\n</div>",
        kind,
        name,
        Escaped(value)
    )
}
