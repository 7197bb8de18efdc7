//! Server-rendered HTML. Every interpolated value goes through [`escape`].

use crate::{
    auth::{Identity, Session},
    config::AuthLinks,
    settings::ProfileSettings,
    users::{ColorScheme, UserRecord},
};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn document(title: &str, theme: Option<ColorScheme>, body: &str) -> String {
    let theme = theme.map(ColorScheme::as_str).unwrap_or("");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body class="{theme}">
{body}
</body>
</html>"#,
        title = escape(title),
        theme = theme,
        body = body,
    )
}

/// Top navigation bar. Pure function of the session.
pub fn navbar(session: &Session, links: &AuthLinks) -> String {
    let right = match session.user() {
        Some(user) => user_nav(user),
        None => format!(
            r#"<div class="auth-links">
<a class="button" href="{login}">Sign In</a>
<a class="button secondary" href="{register}">Sign Up</a>
</div>"#,
            login = escape(&links.login_url),
            register = escape(&links.register_url),
        ),
    };
    format!(
        r#"<nav class="navbar">
<a href="/"><h1>Walid <span class="text-primary">Saas</span></h1></a>
{right}
</nav>"#
    )
}

/// Avatar menu for a signed-in user.
fn user_nav(user: &Identity) -> String {
    let name = user.given_name.as_deref().unwrap_or("");
    let email = user.email.as_deref().unwrap_or("");
    let avatar = match user.picture.as_deref() {
        Some(src) if !src.is_empty() => {
            format!(r#"<img class="avatar" src="{}" alt="{}">"#, escape(src), escape(name))
        }
        _ => {
            let initial = name.chars().next().map(String::from).unwrap_or_default();
            format!(r#"<span class="avatar">{}</span>"#, escape(&initial))
        }
    };
    format!(
        r#"<details class="user-nav">
<summary>{avatar}</summary>
<div class="user-nav-menu">
<p class="user-name">{name}</p>
<p class="user-email">{email}</p>
<a href="/dashboard">Dashboard</a>
<a href="/dashboard/settings">Settings</a>
<a href="/api/auth/logout">Log out</a>
</div>
</details>"#,
        name = escape(name),
        email = escape(email),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Dashboard,
    Settings,
    Billing,
}

impl NavItem {
    const ALL: [NavItem; 3] = [NavItem::Dashboard, NavItem::Settings, NavItem::Billing];

    fn href(self) -> &'static str {
        match self {
            NavItem::Dashboard => "/dashboard",
            NavItem::Settings => "/dashboard/settings",
            NavItem::Billing => "/dashboard/billing",
        }
    }

    fn label(self) -> &'static str {
        match self {
            NavItem::Dashboard => "Your Dashboard",
            NavItem::Settings => "Settings",
            NavItem::Billing => "Billing",
        }
    }
}

fn dashboard_nav(active: NavItem) -> String {
    let items: String = NavItem::ALL
        .iter()
        .map(|item| {
            let class = if *item == active { " class=\"active\"" } else { "" };
            format!(r#"<a href="{}"{}>{}</a>"#, item.href(), class, item.label())
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("<aside class=\"dashboard-nav\">\n{items}\n</aside>")
}

pub struct Layout<'a> {
    pub session: &'a Session,
    pub links: &'a AuthLinks,
    pub theme: Option<ColorScheme>,
    pub active: NavItem,
    pub banner: Option<&'a str>,
}

/// Dashboard chrome around `content`.
pub fn dashboard_page(layout: &Layout<'_>, title: &str, content: &str) -> String {
    let banner = layout
        .banner
        .map(|b| format!(r#"<div class="banner" role="status">{}</div>"#, escape(b)))
        .unwrap_or_default();
    let body = format!(
        r#"{nav}
{banner}
<div class="dashboard">
{side}
<main>
{content}
</main>
</div>"#,
        nav = navbar(layout.session, layout.links),
        side = dashboard_nav(layout.active),
    );
    document(title, layout.theme, &body)
}

pub fn home_page(session: &Session, links: &AuthLinks) -> String {
    let cta = if session.is_authenticated() {
        r#"<a class="button" href="/dashboard">Go to your dashboard</a>"#.to_string()
    } else {
        format!(
            r#"<a class="button" href="{}">Sign up for free</a>"#,
            escape(&links.register_url)
        )
    };
    let body = format!(
        r#"{nav}
<section class="hero">
<h2>Create notes with ease</h2>
<p>Your profile, your colors, your billing in one place.</p>
{cta}
</section>"#,
        nav = navbar(session, links),
    );
    document("Walid Saas", None, &body)
}

pub fn dashboard_index(record: &UserRecord) -> String {
    format!(
        r#"<div class="page-header">
<h1>Welcome back, {name}</h1>
<p class="muted">Signed in as {email}</p>
</div>"#,
        name = escape(record.name.trim()),
        email = escape(&record.email),
    )
}

pub struct SettingsView<'a> {
    pub settings: &'a ProfileSettings,
    pub saved: bool,
    pub error: Option<&'a str>,
}

pub fn settings_content(view: &SettingsView<'_>) -> String {
    let selected = view.settings.color_scheme;
    let options: String = ColorScheme::ALL
        .iter()
        .map(|c| {
            let sel = if Some(*c) == selected { " selected" } else { "" };
            format!(r#"<option value="{}"{}>{}</option>"#, c.as_str(), sel, c.label())
        })
        .collect::<Vec<_>>()
        .join("\n");
    let placeholder_sel = if selected.is_none() { " selected" } else { "" };

    let notice = match (view.error, view.saved) {
        (Some(err), _) => format!(r#"<p class="error" role="alert">{}</p>"#, escape(err)),
        (None, true) => r#"<p class="notice" role="status">Your settings were saved.</p>"#.into(),
        (None, false) => String::new(),
    };

    format!(
        r#"<div class="page-header">
<h1>Settings</h1>
<p class="muted">Your Profile settings</p>
</div>
{notice}
<form class="card" method="post" action="/dashboard/settings">
<h2>General Data</h2>
<p class="muted">Please provide general information about yourself. Please don&apos;t forget to save</p>
<label for="name">Your Name</label>
<input name="name" type="text" id="name" placeholder="Your Name" value="{name}">
<label for="email">Your Email</label>
<input name="email" type="email" id="email" placeholder="Your Email" value="{email}" disabled>
<label for="color">Color Scheme</label>
<select name="color" id="color">
<option value=""{placeholder_sel} disabled>Select a color</option>
{options}
</select>
<button type="submit">Save Now</button>
</form>"#,
        name = escape(&view.settings.name),
        email = escape(&view.settings.email),
    )
}

pub fn billing_content(record: &UserRecord) -> String {
    match record.billing_customer_id.as_deref() {
        Some(customer) => format!(
            r#"<div class="page-header">
<h1>Billing</h1>
<p class="muted">Your account is linked to billing customer <code>{}</code>.</p>
</div>"#,
            escape(customer)
        ),
        None => r#"<div class="page-header">
<h1>Billing</h1>
<p class="muted">Billing setup is still pending for your account.</p>
</div>"#
            .to_string(),
    }
}

/// Standalone error page, used when the layout itself cannot render.
pub fn error_page(session: &Session, links: &AuthLinks, message: &str) -> String {
    let body = format!(
        r#"{nav}
<main class="error-page">
<p class="error">Error: {msg}</p>
</main>"#,
        nav = navbar(session, links),
        msg = escape(message),
    );
    document("Error", None, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn links() -> AuthLinks {
        AppConfig::for_tests().auth_links
    }

    fn signed_in() -> Session {
        Session(Some(Identity {
            id: "u1".into(),
            email: Some("jane@example.com".into()),
            given_name: Some("Jane".into()),
            family_name: Some("Doe".into()),
            picture: Some("https://img.example.com/j.png".into()),
        }))
    }

    #[test]
    fn escape_covers_html_specials() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn navbar_signed_out_shows_auth_links() {
        let html = navbar(&Session(None), &links());
        assert!(html.contains("Sign In"));
        assert!(html.contains("Sign Up"));
        assert!(html.contains(r#"href="/api/auth/login""#));
        assert!(html.contains(r#"href="/api/auth/register""#));
        assert!(!html.contains("user-nav"));
    }

    #[test]
    fn navbar_signed_in_shows_user_menu() {
        let html = navbar(&signed_in(), &links());
        assert!(html.contains("user-nav"));
        assert!(html.contains("Jane"));
        assert!(html.contains("jane@example.com"));
        assert!(html.contains("https://img.example.com/j.png"));
        assert!(!html.contains("Sign In"));
    }

    #[test]
    fn navbar_escapes_identity_fields() {
        let session = Session(Some(Identity {
            id: "u1".into(),
            email: None,
            given_name: Some("<script>".into()),
            family_name: None,
            picture: None,
        }));
        let html = navbar(&session, &links());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn settings_form_preselects_current_color_and_locks_email() {
        let settings = ProfileSettings {
            name: "Jane".into(),
            email: "jane@example.com".into(),
            color_scheme: Some(ColorScheme::Violet),
        };
        let html = settings_content(&SettingsView {
            settings: &settings,
            saved: false,
            error: None,
        });
        assert!(html.contains(r#"<option value="theme-violet" selected>Violet</option>"#));
        assert!(html.contains(r#"<option value="theme-red">Red</option>"#));
        assert!(html.contains(r#"value="jane@example.com" disabled"#));
        for c in ColorScheme::ALL {
            assert!(html.contains(c.as_str()));
        }
    }

    #[test]
    fn settings_form_shows_error_over_saved_notice() {
        let settings = ProfileSettings {
            name: String::new(),
            email: "a@x.com".into(),
            color_scheme: None,
        };
        let html = settings_content(&SettingsView {
            settings: &settings,
            saved: true,
            error: Some("Please pick one of the listed colors."),
        });
        assert!(html.contains("role=\"alert\""));
        assert!(!html.contains("were saved"));
        assert!(html.contains(r#"<option value="" selected disabled>"#));
    }

    #[test]
    fn dashboard_page_applies_theme_and_marks_active_nav() {
        let session = signed_in();
        let links = links();
        let html = dashboard_page(
            &Layout {
                session: &session,
                links: &links,
                theme: Some(ColorScheme::Red),
                active: NavItem::Settings,
                banner: Some("Billing setup is pending."),
            },
            "Settings",
            "<p>content</p>",
        );
        assert!(html.contains(r#"<body class="theme-red">"#));
        assert!(html.contains(r#"<a href="/dashboard/settings" class="active">Settings</a>"#));
        assert!(html.contains("Billing setup is pending."));
        assert!(html.contains("<p>content</p>"));
    }
}
