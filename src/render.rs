//! Server-rendered HTML pages.

use std::fmt::Write;

use actix_web::{http::StatusCode, HttpResponse};

use crate::auth::FlashMessage;
use crate::models::{FriendView, HomeFeed, Profile, ProfilePage, Tweet, TweetView, User};
use crate::service::MAX_TWEET_CHARS;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn layout(title: &str, viewer: Option<&User>, flashes: &[FlashMessage], content: &str) -> String {
    let nav = match viewer {
        Some(user) => format!(
            r#"<a href="/home/">Home</a> <a href="/profile/{}/">{}</a> <a href="/tweets/create/">Tweet</a>
<form method="post" action="/signout/" class="inline"><button type="submit">Sign out</button></form>"#,
            user.profile_id,
            escape(&user.username)
        ),
        None => r#"<a href="/signin/">Sign in</a> <a href="/signup/">Sign up</a>"#.to_string(),
    };
    let mut messages = String::new();
    for message in flashes {
        let _ = write!(
            messages,
            r#"<p class="message {}">{}</p>"#,
            message.level.css_class(),
            escape(&message.text)
        );
    }
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<nav>{nav}</nav>
{messages}
<main>
{content}
</main>
</body>
</html>"#,
        title = escape(title),
    )
}

fn form_error(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default()
}

fn tweet_item(view: &TweetView, liked: Option<bool>, is_own: bool) -> String {
    let tweet = &view.tweet;
    let mut actions = String::new();
    match liked {
        Some(true) => {
            let _ = write!(
                actions,
                r#"<form method="post" action="/tweets/{}/unlike/" class="inline"><button type="submit">Unlike</button></form>"#,
                tweet.tweet_id
            );
        }
        Some(false) => {
            let _ = write!(
                actions,
                r#"<form method="post" action="/tweets/{}/like/" class="inline"><button type="submit">Like</button></form>"#,
                tweet.tweet_id
            );
        }
        None => {}
    }
    if is_own {
        let _ = write!(
            actions,
            r#" <a href="/tweets/{}/delete/">Delete</a>"#,
            tweet.tweet_id
        );
    }
    format!(
        r#"<article class="tweet">
<header><a href="/profile/{profile}/">@{author}</a> <a href="/tweets/{id}/"><time>{at}</time></a></header>
<p>{content}</p>
{actions}
</article>"#,
        profile = view.author.profile_id,
        author = escape(&view.author.username),
        id = tweet.tweet_id,
        at = tweet.created_at.format("%Y-%m-%d %H:%M"),
        content = escape(&tweet.content),
    )
}

pub fn welcome(viewer: Option<&User>, flashes: &[FlashMessage]) -> HttpResponse {
    let content = r#"<h1>Welcome</h1>
<p>Share what is happening in 140 characters or less.</p>
<p><a href="/signup/">Create an account</a> or <a href="/signin/">sign in</a>.</p>"#;
    html(StatusCode::OK, layout("Welcome", viewer, flashes, content))
}

pub fn signup(status: StatusCode, flashes: &[FlashMessage], error: Option<&str>) -> HttpResponse {
    let content = format!(
        r#"<h1>Sign up</h1>
{}
<form method="post" action="/signup/">
<label>Username <input name="username" required maxlength="150"></label>
<label>Email <input name="email" type="email"></label>
<label>Password <input name="password1" type="password" required></label>
<label>Password confirmation <input name="password2" type="password" required></label>
<button type="submit">Sign up</button>
</form>"#,
        form_error(error)
    );
    html(status, layout("Sign up", None, flashes, &content))
}

pub fn signin(status: StatusCode, flashes: &[FlashMessage], error: Option<&str>) -> HttpResponse {
    let content = format!(
        r#"<h1>Sign in</h1>
{}
<form method="post" action="/signin/">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Sign in</button>
</form>"#,
        form_error(error)
    );
    html(status, layout("Sign in", None, flashes, &content))
}

pub fn home(feed: &HomeFeed, flashes: &[FlashMessage]) -> HttpResponse {
    let mut content = String::from("<h1>Home</h1>\n<section class=\"following\"><h2>Following</h2><ul>");
    for user in &feed.following {
        let _ = write!(
            content,
            r#"<li><a href="/profile/{}/">@{}</a></li>"#,
            user.profile_id,
            escape(&user.username)
        );
    }
    content.push_str("</ul></section>\n<section class=\"feed\">");
    if feed.items.is_empty() {
        content.push_str("<p>No tweets yet.</p>");
    }
    for item in &feed.items {
        let view = TweetView {
            tweet: item.tweet.clone(),
            author: item.author.clone(),
        };
        let is_own = item.author.user_id == feed.viewer.user_id;
        content.push_str(&tweet_item(&view, Some(item.liked), is_own));
    }
    content.push_str("</section>");
    html(
        StatusCode::OK,
        layout("Home", Some(&feed.viewer), flashes, &content),
    )
}

pub fn profile(page: &ProfilePage, viewer: &User, flashes: &[FlashMessage]) -> HttpResponse {
    let owner = &page.owner;
    let username = escape(&owner.username);
    let mut content = format!(
        r#"<h1>{display}</h1>
<p>@{username}</p>
<p class="bio">{bio}</p>
<p><a href="/{username}/following_list/">{following} following</a> · <a href="/{username}/follower_list/">{followers} followers</a></p>
"#,
        display = escape(&page.profile.display_name),
        bio = escape(&page.profile.bio),
        following = page.following_count,
        followers = page.follower_count,
    );
    if page.is_own {
        let _ = write!(
            content,
            r#"<p><a href="/profile/edit/{}/">Edit profile</a></p>"#,
            page.profile.profile_id
        );
    } else if page.viewer_follows {
        let _ = write!(
            content,
            r#"<form method="post" action="/{username}/unfollow/"><button type="submit">Unfollow</button></form>"#
        );
    } else {
        let _ = write!(
            content,
            r#"<form method="post" action="/{username}/follow/"><button type="submit">Follow</button></form>"#
        );
    }
    content.push_str("<section class=\"tweets\">");
    for view in &page.tweets {
        content.push_str(&tweet_item(view, None, page.is_own));
    }
    content.push_str("</section>");
    html(
        StatusCode::OK,
        layout(&owner.username, Some(viewer), flashes, &content),
    )
}

pub fn profile_edit(
    status: StatusCode,
    profile: &Profile,
    viewer: &User,
    flashes: &[FlashMessage],
    error: Option<&str>,
) -> HttpResponse {
    let content = format!(
        r#"<h1>Edit profile</h1>
{error}
<form method="post" action="/profile/edit/{id}/">
<label>Display name <input name="display_name" value="{display}" required maxlength="50"></label>
<label>Bio <textarea name="bio" maxlength="160">{bio}</textarea></label>
<button type="submit">Save</button>
</form>"#,
        error = form_error(error),
        id = profile.profile_id,
        display = escape(&profile.display_name),
        bio = escape(&profile.bio),
    );
    html(status, layout("Edit profile", Some(viewer), flashes, &content))
}

pub fn friend_list(
    heading: &str,
    user: &User,
    views: &[FriendView],
    viewer: &User,
    flashes: &[FlashMessage],
) -> HttpResponse {
    let mut content = format!(
        r#"<h1>@{} · {}</h1><ul>"#,
        escape(&user.username),
        escape(heading)
    );
    if views.is_empty() {
        content.push_str("<li>Nobody yet.</li>");
    }
    for view in views {
        let _ = write!(
            content,
            r#"<li><a href="/profile/{}/">@{}</a> since {}</li>"#,
            view.user.profile_id,
            escape(&view.user.username),
            view.friendship.created_at.format("%Y-%m-%d")
        );
    }
    content.push_str("</ul>");
    html(StatusCode::OK, layout(heading, Some(viewer), flashes, &content))
}

pub fn tweet_detail(
    view: &TweetView,
    viewer: Option<&User>,
    liked: Option<bool>,
    flashes: &[FlashMessage],
) -> HttpResponse {
    let is_own = viewer.map_or(false, |v| v.user_id == view.author.user_id);
    let content = tweet_item(view, liked, is_own);
    html(StatusCode::OK, layout("Tweet", viewer, flashes, &content))
}

pub fn tweet_create(viewer: &User, flashes: &[FlashMessage]) -> HttpResponse {
    let body = format!(
        r#"<h1>New tweet</h1>
<form method="post" action="/tweets/create/">
<textarea name="content" maxlength="{MAX_TWEET_CHARS}" required></textarea>
<button type="submit">Tweet</button>
</form>"#
    );
    html(StatusCode::OK, layout("New tweet", Some(viewer), flashes, &body))
}

pub fn tweet_delete(tweet: &Tweet, viewer: &User, flashes: &[FlashMessage]) -> HttpResponse {
    let content = format!(
        r#"<h1>Delete tweet?</h1>
<blockquote>{}</blockquote>
<form method="post" action="/tweets/{}/delete/"><button type="submit">Delete</button></form>
<p><a href="/home/">Cancel</a></p>"#,
        escape(&tweet.content),
        tweet.tweet_id
    );
    html(
        StatusCode::OK,
        layout("Delete tweet", Some(viewer), flashes, &content),
    )
}

pub fn error_page(status: StatusCode, message: &str) -> HttpResponse {
    let title = status.canonical_reason().unwrap_or("Error");
    let content = format!(
        r#"<h1>{}</h1><p>{}</p><p><a href="/home/">Back to home</a></p>"#,
        escape(title),
        escape(message)
    );
    html(status, layout(title, None, &[], &content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#x27;y&#x27;&quot;)&lt;/script&gt;"
        );
    }
}
