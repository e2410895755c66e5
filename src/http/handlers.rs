use axum::{
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::comments::CommentService;
use crate::app::forms::{
    validate_comment, validate_post, validate_signup, FormErrors, SignupInput, NON_FIELD,
    TEXT_REQUIRED,
};
use crate::app::groups::GroupService;
use crate::app::images::{unreferenced_image, ImageService};
use crate::app::page_cache::PageCache;
use crate::app::pagination::PageRequest;
use crate::app::posts::{PostFilter, PostService};
use crate::app::social::SocialService;
use crate::app::users::UserService;
use crate::domain::ownership::Owned;
use crate::domain::post::Post;
use crate::http::auth::{
    redirect_after_login, session_cookie, session_cookie_removal, SESSION_COOKIE,
};
use crate::http::forms::read_post_form;
use crate::http::{AppError, AuthUser};
use crate::render::pages::{
    FollowPage, GroupPage, IndexPage, LoggedOutPage, LoginPage, PostDetailPage, PostFormPage,
    ProfilePage, SignupPage,
};
use crate::render::{render, RenderContext, Template};
use crate::AppState;

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const FIELD_REQUIRED: &str = "This field is required.";

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    fn request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref())
    }
}

fn render_page<T: Template>(
    template: &T,
    viewer: Option<&AuthUser>,
    state: &AppState,
) -> Result<Html<String>, AppError> {
    let ctx = RenderContext::new(viewer, &state.media_base_url);
    render(template, &ctx).map(Html).map_err(|err| {
        tracing::error!(error = ?err, template = template.name(), "failed to render page");
        AppError::internal("failed to render page")
    })
}

/// Malformed ids cannot name a post, so they are plain 404s.
fn parse_post_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("post not found"))
}

fn post_detail_path(post_id: Uuid) -> String {
    format!("/posts/{}/", post_id)
}

fn profile_path(username: &str) -> String {
    format!("/profile/{}/", username)
}

async fn load_post(state: &AppState, post_id: Uuid) -> Result<Post, AppError> {
    PostService::new(state.db.clone())
        .get_post(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to fetch post");
            AppError::internal("failed to fetch post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))
}

async fn load_author(state: &AppState, username: &str) -> Result<crate::domain::user::User, AppError> {
    UserService::new(state.db.clone())
        .get_by_username(username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username = %username, "failed to fetch user");
            AppError::internal("failed to fetch user")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))
}

async fn load_groups(state: &AppState) -> Result<Vec<crate::domain::group::Group>, AppError> {
    GroupService::new(state.db.clone())
        .list_groups()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list groups");
            AppError::internal("failed to list groups")
        })
}

async fn list_posts(
    state: &AppState,
    filter: PostFilter,
    request: PageRequest,
) -> Result<crate::app::pagination::Page<Post>, AppError> {
    PostService::new(state.db.clone())
        .list(filter, request)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, filter = ?filter, page = request.number(), "failed to list posts");
            AppError::internal("failed to list posts")
        })
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

pub async fn not_found() -> AppError {
    AppError::not_found("The requested page was not found on this server.")
}

pub async fn index(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let request = query.request();
    let cache = PageCache::new(state.cache.clone(), state.index_cache_ttl_seconds);
    let lookup = cache
        .lookup_index(viewer.as_ref().map(|viewer| viewer.user_id), request)
        .await;
    if let Some(html) = lookup.html {
        return Ok(Html(html));
    }

    let page = list_posts(&state, PostFilter::All, request).await?;
    let html = render_page(&IndexPage { page: &page }, viewer.as_ref(), &state)?;
    cache.store(&lookup.key, &html.0).await;
    Ok(html)
}

pub async fn group_posts(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let group = GroupService::new(state.db.clone())
        .get_by_slug(&slug)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to fetch group");
            AppError::internal("failed to fetch group")
        })?
        .ok_or_else(|| AppError::not_found("group not found"))?;

    let page = list_posts(&state, PostFilter::Group(group.id), query.request()).await?;
    render_page(&GroupPage { group: &group, page: &page }, viewer.as_ref(), &state)
}

pub async fn profile(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let author = load_author(&state, &username).await?;
    let page = list_posts(&state, PostFilter::Author(author.id), query.request()).await?;
    let post_count = PostService::new(state.db.clone())
        .count_by_author(author.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %author.id, "failed to count posts");
            AppError::internal("failed to count posts")
        })?;

    let following = match &viewer {
        Some(viewer) if viewer.user_id != author.id => SocialService::new(state.db.clone())
            .is_following(viewer.user_id, author.id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %viewer.user_id, author_id = %author.id, "failed to read follow status");
                AppError::internal("failed to read follow status")
            })?,
        _ => false,
    };

    let template = ProfilePage {
        author: &author,
        page: &page,
        post_count,
        following,
    };
    render_page(&template, viewer.as_ref(), &state)
}

#[derive(Deserialize)]
pub struct DetailQuery {
    pub comment_error: Option<String>,
}

pub async fn post_detail(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Html<String>, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let post = load_post(&state, post_id).await?;

    let author_post_count = PostService::new(state.db.clone())
        .count_by_author(post.author_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %post.author_id, "failed to count posts");
            AppError::internal("failed to count posts")
        })?;
    let comments = CommentService::new(state.db.clone())
        .list_for_post(post.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post.id, "failed to list comments");
            AppError::internal("failed to list comments")
        })?;

    let comment_error = match (&viewer, &query.comment_error) {
        (Some(_), Some(_)) => Some(TEXT_REQUIRED),
        _ => None,
    };

    let template = PostDetailPage {
        post: &post,
        author_post_count,
        comments: &comments,
        comment_error,
    };
    render_page(&template, viewer.as_ref(), &state)
}

pub async fn post_create_form(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let groups = load_groups(&state).await?;
    let errors = FormErrors::new();
    let template = PostFormPage {
        editing: None,
        text: "",
        selected_group: None,
        groups: &groups,
        current_image: None,
        errors: &errors,
    };
    render_page(&template, Some(&auth), &state)
}

pub async fn post_create(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let input = read_post_form(multipart).await?;
    let groups = load_groups(&state).await?;

    let draft = match validate_post(&input, &groups) {
        Ok(draft) => draft,
        Err(errors) => {
            let template = PostFormPage {
                editing: None,
                text: &input.text,
                selected_group: Some(input.group.as_str()),
                groups: &groups,
                current_image: None,
                errors: &errors,
            };
            return Ok(render_page(&template, Some(&auth), &state)?.into_response());
        }
    };

    let images = ImageService::new(state.storage.clone());
    let image_key = match &draft.image {
        Some(image) => Some(images.store_post_image(image).await.map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to store post image");
            AppError::internal("failed to store image")
        })?),
        None => None,
    };

    let created = PostService::new(state.db.clone())
        .create_post(auth.user_id, draft.text, draft.group_id, image_key.clone())
        .await;
    if let Some(key) = unreferenced_image(None, image_key.as_deref(), created.is_ok()) {
        images.discard(key).await;
    }
    let post = created.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to create post");
        AppError::internal("failed to create post")
    })?;

    tracing::info!(post_id = %post.id, user_id = %auth.user_id, "post created");
    Ok(Redirect::to(&profile_path(&auth.username)).into_response())
}

pub async fn post_edit_form(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Response, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let post = load_post(&state, post_id).await?;
    if !post.is_owned_by(auth.user_id) {
        return Ok(Redirect::to(&post_detail_path(post.id)).into_response());
    }

    let groups = load_groups(&state).await?;
    let selected = post.group.as_ref().map(|group| group.id.to_string());
    let errors = FormErrors::new();
    let template = PostFormPage {
        editing: Some(post.id),
        text: &post.text,
        selected_group: selected.as_deref(),
        groups: &groups,
        current_image: post.image_key.as_deref(),
        errors: &errors,
    };
    Ok(render_page(&template, Some(&auth), &state)?.into_response())
}

pub async fn post_edit(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let post = load_post(&state, post_id).await?;
    if !post.is_owned_by(auth.user_id) {
        tracing::debug!(post_id = %post.id, user_id = %auth.user_id, "edit by non-author ignored");
        return Ok(Redirect::to(&post_detail_path(post.id)).into_response());
    }

    let input = read_post_form(multipart).await?;
    let groups = load_groups(&state).await?;
    let draft = match validate_post(&input, &groups) {
        Ok(draft) => draft,
        Err(errors) => {
            let template = PostFormPage {
                editing: Some(post.id),
                text: &input.text,
                selected_group: Some(input.group.as_str()),
                groups: &groups,
                current_image: post.image_key.as_deref(),
                errors: &errors,
            };
            return Ok(render_page(&template, Some(&auth), &state)?.into_response());
        }
    };

    let images = ImageService::new(state.storage.clone());
    let image_key = match &draft.image {
        Some(image) => Some(images.store_post_image(image).await.map_err(|err| {
            tracing::error!(error = ?err, post_id = %post.id, "failed to store post image");
            AppError::internal("failed to store image")
        })?),
        None if draft.clear_image => None,
        None => post.image_key.clone(),
    };

    let updated = PostService::new(state.db.clone())
        .update_post(post.id, auth.user_id, draft.text, draft.group_id, image_key.clone())
        .await;
    let saved = matches!(updated, Ok(Some(_)));
    if let Some(key) = unreferenced_image(post.image_key.as_deref(), image_key.as_deref(), saved) {
        images.discard(key).await;
    }
    updated
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post.id, "failed to update post");
            AppError::internal("failed to update post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    Ok(Redirect::to(&post_detail_path(post.id)).into_response())
}

pub async fn post_delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Redirect, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let post = load_post(&state, post_id).await?;
    if !post.is_owned_by(auth.user_id) {
        return Ok(Redirect::to(&post_detail_path(post.id)));
    }

    let deleted = PostService::new(state.db.clone())
        .delete_post(post.id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post.id, "failed to delete post");
            AppError::internal("failed to delete post")
        })?;

    if deleted {
        if let Some(key) = &post.image_key {
            ImageService::new(state.storage.clone()).discard(key).await;
        }
        tracing::info!(post_id = %post.id, user_id = %auth.user_id, "post deleted");
    }

    Ok(Redirect::to(&profile_path(&post.author_username)))
}

#[derive(Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

pub async fn add_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let post = load_post(&state, post_id).await?;

    let text = match validate_comment(&form.text) {
        Ok(text) => text,
        Err(_) => {
            return Ok(Redirect::to(&format!(
                "{}?comment_error=1",
                post_detail_path(post.id)
            )))
        }
    };

    CommentService::new(state.db.clone())
        .add_comment(post.id, auth.user_id, text)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post.id, user_id = %auth.user_id, "failed to add comment");
            AppError::internal("failed to add comment")
        })?;

    Ok(Redirect::to(&post_detail_path(post.id)))
}

pub async fn comment_redirect(
    _auth: AuthUser,
    Path(post_id): Path<String>,
) -> Result<Redirect, AppError> {
    let post_id = parse_post_id(&post_id)?;
    Ok(Redirect::to(&post_detail_path(post_id)))
}

pub async fn follow_index(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = list_posts(&state, PostFilter::FollowedBy(auth.user_id), query.request()).await?;
    render_page(&FollowPage { page: &page }, Some(&auth), &state)
}

pub async fn profile_follow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let author = load_author(&state, &username).await?;
    if author.id != auth.user_id {
        let social = SocialService::new(state.db.clone());
        let already = social
            .is_following(auth.user_id, author.id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %auth.user_id, author_id = %author.id, "failed to read follow status");
                AppError::internal("failed to follow")
            })?;
        if !already {
            social.follow(auth.user_id, author.id).await.map_err(|err| {
                tracing::error!(error = ?err, user_id = %auth.user_id, author_id = %author.id, "failed to follow");
                AppError::internal("failed to follow")
            })?;
        }
    }

    Ok(Redirect::to(&profile_path(&author.username)))
}

pub async fn profile_unfollow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let author = load_author(&state, &username).await?;
    SocialService::new(state.db.clone())
        .unfollow(auth.user_id, author.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, author_id = %author.id, "failed to unfollow");
            AppError::internal("failed to unfollow")
        })?;

    Ok(Redirect::to(&profile_path(&author.username)))
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), state.session_key, state.session_ttl_hours)
}

pub async fn signup_form(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let errors = FormErrors::new();
    let template = SignupPage {
        username: "",
        email: "",
        errors: &errors,
    };
    render_page(&template, None, &state)
}

#[derive(Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let input = SignupInput {
        username: form.username,
        email: form.email,
        password1: form.password1,
        password2: form.password2,
    };

    let rerender = |errors: FormErrors| -> Result<Response, AppError> {
        let template = SignupPage {
            username: &input.username,
            email: &input.email,
            errors: &errors,
        };
        Ok(render_page(&template, None, &state)?.into_response())
    };

    let draft = match validate_signup(&input) {
        Ok(draft) => draft,
        Err(errors) => return rerender(errors),
    };

    let service = auth_service(&state);
    let user = match service
        .signup(draft.username, draft.email, draft.password)
        .await
    {
        Ok(user) => user,
        Err(err) if is_username_taken(&err) => {
            return rerender(FormErrors::single("username", USERNAME_TAKEN))
        }
        Err(err) => {
            tracing::error!(error = ?err, "failed to sign up");
            return Err(AppError::internal("failed to sign up"));
        }
    };

    let session = service.create_session(user.id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %user.id, "failed to open session");
        AppError::internal("failed to sign up")
    })?;

    tracing::info!(user_id = %user.id, "user signed up");
    let jar = jar.add(session_cookie(session.token, session.expires_at));
    Ok((jar, Redirect::to("/")).into_response())
}

fn is_username_taken(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some("users_username_key")
        }
        _ => false,
    }
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

pub async fn login_form(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Html<String>, AppError> {
    let errors = FormErrors::new();
    let template = LoginPage {
        username: "",
        next: query.next.as_deref(),
        errors: &errors,
    };
    render_page(&template, None, &state)
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();
    let mut errors = FormErrors::new();
    if username.is_empty() {
        errors.add("username", FIELD_REQUIRED);
    }
    if form.password.is_empty() {
        errors.add("password", FIELD_REQUIRED);
    }

    if errors.is_empty() {
        let session = auth_service(&state)
            .login(username, &form.password)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to login");
                AppError::internal("failed to login")
            })?;

        if let Some(session) = session {
            let jar = jar.add(session_cookie(session.token, session.expires_at));
            return Ok((jar, redirect_after_login(form.next.as_deref())).into_response());
        }
        errors.add(NON_FIELD, INVALID_LOGIN);
    }

    let template = LoginPage {
        username,
        next: form.next.as_deref(),
        errors: &errors,
    };
    Ok(render_page(&template, None, &state)?.into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        auth_service(&state)
            .revoke_session(cookie.value())
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to revoke session");
                AppError::internal("failed to log out")
            })?;
    }

    let html = render_page(&LoggedOutPage, None, &state)?;
    Ok((jar.remove(session_cookie_removal()), html).into_response())
}
