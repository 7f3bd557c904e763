use axum::{debug_handler, extract::State, http::{header, StatusCode}, response::{Html, IntoResponse}};

use crate::{config::SiteInfo, db::users::User, session::Viewer, AppState};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Spinner shown until the first refresh replaces it.
pub const LOADING: &str = include_res!(str, "/pages/loading.html");

/// Also encodes braces so user text can never form a `{placeholder}` that a
/// later `replace` in the same template chain would fill.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}

/// Room descriptions and rules are written by admins in markdown.
pub fn markdown(text: &str) -> String {
    use pulldown_cmark::{Options, Parser};

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH));
    html.replace('{', "&#123;").replace('}', "&#125;")
}

pub fn alert(message: Option<&str>) -> String {
    match message {
        Some(message) => format!(r#"<div class="alert">{}</div>"#, escape(message)),
        None => String::new(),
    }
}

fn navbar(user: Option<&User>) -> String {
    let mut links = String::from(
        r#"<a href="/">Home</a><a href="/rooms">Rooms</a><a href="/booking">Book</a><a href="/contact">Contact</a>"#,
    );
    match user {
        Some(user) => {
            links += r#"<a href="/my-bookings">My Bookings</a>"#;
            if user.is_admin() {
                links += r#"<a href="/dashboard">Dashboard</a><a href="/inbox">Inbox</a><a href="/edit-rooms">Edit Rooms</a>"#;
            }
            links += &format!(
                r#"<span class="who">{}</span><a href="/signout">Sign out</a>"#,
                escape(&user.email)
            );
        }
        None => links += r#"<a href="/signin">Sign in</a><a href="/signup">Sign up</a>"#,
    }

    include_res!(str, "/pages/navbar.html").replace("{links}", &links)
}

fn footer(site: &SiteInfo) -> String {
    include_res!(str, "/pages/footer.html")
        .replace("{site_name}", &escape(&site.name))
        .replace("{tagline}", &escape(&site.tagline))
        .replace("{address}", &escape(&site.address))
        .replace("{phone}", &escape(&site.phone))
        .replace("{email}", &escape(&site.email))
}

/// Wraps page content with the navbar and footer.
pub struct Page<'a> {
    pub title: &'a str,
    pub site: &'a SiteInfo,
    pub user: Option<&'a User>,
    pub alert: Option<&'a str>,
}

impl Page<'_> {
    pub fn render(&self, content: &str) -> Html<String> {
        Html(
            include_res!(str, "/pages/layout.html")
                .replace("{title}", &escape(&format!("{} | {}", self.title, self.site.name)))
                .replace("{navbar}", &navbar(self.user))
                .replace("{alert}", &alert(self.alert))
                .replace("{footer}", &footer(self.site))
                .replace("{content}", content),
        )
    }
}

#[debug_handler]
pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], include_res!(str, "/static/site.css"))
}

#[debug_handler]
pub async fn placeholder() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], include_res!(bytes, "/static/room-placeholder.svg"))
}

#[debug_handler(state = AppState)]
pub async fn not_found(State(state): State<AppState>, Viewer(user): Viewer) -> impl IntoResponse {
    let page = Page {
        title: "Not found",
        site: &state.config.site,
        user: user.as_ref(),
        alert: None,
    };
    (StatusCode::NOT_FOUND, page.render(include_res!(str, "/pages/not_found.html")))
}

#[debug_handler(state = AppState)]
pub async fn terms(State(state): State<AppState>, Viewer(user): Viewer) -> Html<String> {
    let page = Page {
        title: "Terms of Service & Privacy Policy",
        site: &state.config.site,
        user: user.as_ref(),
        alert: None,
    };
    page.render(&include_res!(str, "/pages/terms.html").replace("{site_name}", &escape(&state.config.site.name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
        assert_eq!(escape("{special_requests}"), "&#123;special_requests&#125;");
    }

    #[test]
    fn markdown_cannot_leave_placeholders() {
        let html = markdown("Ask for {site_name} at the desk");
        assert!(!html.contains("{site_name}"));
        assert!(html.contains("&#123;site_name&#125;"));
    }

    #[test]
    fn renders_markdown_lists() {
        let html = markdown("- no smoking\n- no pets");
        assert!(html.contains("<li>no smoking</li>"));
    }

    #[test]
    fn navbar_shows_admin_links_only_to_admins() {
        let admin = User::test("boss@hotel.com", crate::db::users::Role::Admin);
        let guest = User::test("guest@hotel.com", crate::db::users::Role::User);

        assert!(navbar(Some(&admin)).contains("/dashboard"));
        assert!(!navbar(Some(&guest)).contains("/dashboard"));
        assert!(navbar(None).contains("/signin"));
    }
}
