//! Server-side HTML rendering.
//!
//! Each page is a [`Template`]: a name, a title and a body writer. [`render`]
//! wraps the body in the shared layout, whose navigation depends on the
//! viewer carried by the [`RenderContext`].

use std::fmt::{self, Write};

use uuid::Uuid;

use crate::http::AuthUser;

pub mod html;
pub mod pages;

use html::Escaped;

pub trait Template {
    /// Identifies the template; emitted as `data-template` on `<body>`.
    fn name(&self) -> &'static str;

    fn title(&self) -> String;

    fn write_body(&self, ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result;
}

/// Per-request values every template may read.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub viewer: Option<&'a AuthUser>,
    pub media_base_url: &'a str,
}

impl<'a> RenderContext<'a> {
    pub fn new(viewer: Option<&'a AuthUser>, media_base_url: &'a str) -> Self {
        Self {
            viewer,
            media_base_url,
        }
    }

    pub fn anonymous() -> RenderContext<'static> {
        RenderContext {
            viewer: None,
            media_base_url: "",
        }
    }

    pub fn viewer_id(&self) -> Option<Uuid> {
        self.viewer.map(|viewer| viewer.user_id)
    }

    pub fn image_url(&self, key: &str) -> String {
        format!("{}/{}", self.media_base_url.trim_end_matches('/'), key)
    }
}

pub fn render<T: Template>(template: &T, ctx: &RenderContext<'_>) -> Result<String, fmt::Error> {
    let mut body = String::new();
    template.write_body(ctx, &mut body)?;

    let mut out = String::with_capacity(body.len() + 1024);
    write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body data-template=\"{}\">\n",
        Escaped(&template.title()),
        template.name(),
    )?;
    write_header(ctx, &mut out)?;
    out.push_str("<main class=\"container\">\n");
    out.push_str(&body);
    out.push_str("</main>\n<footer class=\"footer\"><p>&copy; Yatube</p></footer>\n</body>\n</html>\n");
    Ok(out)
}

fn write_header(ctx: &RenderContext<'_>, out: &mut String) -> fmt::Result {
    out.push_str("<header class=\"navbar\">\n<a class=\"brand\" href=\"/\">Yatube</a>\n<nav>\n");
    out.push_str("<a href=\"/\">Home</a>\n");
    match ctx.viewer {
        Some(viewer) => {
            out.push_str("<a href=\"/create/\">New post</a>\n");
            out.push_str("<a href=\"/follow/\">Following</a>\n");
            writeln!(
                out,
                "<a class=\"viewer\" href=\"/profile/{0}/\">{0}</a>",
                Escaped(&viewer.username)
            )?;
            out.push_str("<a href=\"/auth/logout/\">Log out</a>\n");
        }
        None => {
            out.push_str("<a href=\"/auth/login/\">Log in</a>\n");
            out.push_str("<a href=\"/auth/signup/\">Sign up</a>\n");
        }
    }
    out.push_str("</nav>\n</header>\n");
    Ok(())
}
