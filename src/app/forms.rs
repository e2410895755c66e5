use bytes::Bytes;
use image::ImageFormat;
use uuid::Uuid;

use crate::domain::group::Group;

/// Field key for errors that belong to the form as a whole.
pub const NON_FIELD: &str = "__all__";

pub const TEXT_REQUIRED: &str = "This field must not be empty.";
pub const INVALID_GROUP: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

const USERNAME_MAX_LEN: usize = 150;
const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 128;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    entries: Vec<(&'static str, String)>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| *name == field)
    }

    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Raw post form fields as submitted.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group: String,
    pub image: Option<ImageUpload>,
    pub clear_image: bool,
}

#[derive(Debug, Clone)]
pub struct ValidImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub extension: &'static str,
}

#[derive(Debug, Clone)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<ValidImage>,
    pub clear_image: bool,
}

pub fn validate_post(input: &PostInput, groups: &[Group]) -> Result<PostDraft, FormErrors> {
    let mut errors = FormErrors::new();

    let text = input.text.trim();
    if text.is_empty() {
        errors.add("text", TEXT_REQUIRED);
    }

    let group = input.group.trim();
    let group_id = if group.is_empty() {
        None
    } else {
        match Uuid::parse_str(group) {
            Ok(id) if groups.iter().any(|candidate| candidate.id == id) => Some(id),
            _ => {
                errors.add("group", INVALID_GROUP);
                None
            }
        }
    };

    let image = match &input.image {
        Some(upload) => match validate_image(upload) {
            Ok(image) => Some(image),
            Err(message) => {
                errors.add("image", message);
                None
            }
        },
        None => None,
    };

    errors.finish(PostDraft {
        text: text.to_string(),
        group_id,
        image,
        clear_image: input.clear_image,
    })
}

pub fn validate_comment(text: &str) -> Result<String, FormErrors> {
    let text = text.trim();
    if text.is_empty() {
        return Err(FormErrors::single("text", TEXT_REQUIRED));
    }
    Ok(text.to_string())
}

/// Accepts PNG, JPEG, GIF and WebP payloads that actually decode.
pub fn validate_image(upload: &ImageUpload) -> Result<ValidImage, &'static str> {
    let format = image::guess_format(&upload.bytes).map_err(|_| INVALID_IMAGE)?;
    if !matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
    ) {
        return Err(INVALID_IMAGE);
    }
    image::load_from_memory_with_format(&upload.bytes, format).map_err(|_| INVALID_IMAGE)?;

    let extension = format.extensions_str().first().copied().ok_or(INVALID_IMAGE)?;
    Ok(ValidImage {
        bytes: upload.bytes.clone(),
        content_type: format.to_mime_type(),
        extension,
    })
}

#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone)]
pub struct SignupDraft {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

pub fn validate_signup(input: &SignupInput) -> Result<SignupDraft, FormErrors> {
    let mut errors = FormErrors::new();

    let username = input.username.trim();
    if username.is_empty() {
        errors.add("username", "This field is required.");
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.add("username", "Ensure this value has at most 150 characters.");
    } else if !username.chars().all(is_username_char) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    let email = input.email.trim();
    if !email.is_empty() && !looks_like_email(email) {
        errors.add("email", "Enter a valid email address.");
    }

    if input.password1.chars().count() < PASSWORD_MIN_LEN {
        errors.add("password1", "This password is too short. It must contain at least 8 characters.");
    } else if input.password1.len() > PASSWORD_MAX_LEN {
        errors.add("password1", "This password is too long. It must contain at most 128 characters.");
    }
    if input.password1 != input.password2 {
        errors.add("password2", "The two password fields didn't match.");
    }

    errors.finish(SignupDraft {
        username: username.to_string(),
        email: (!email.is_empty()).then(|| email.to_string()),
        password: input.password1.clone(),
    })
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
