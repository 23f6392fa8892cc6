use actix_web::HttpResponse;
use actix_web::cookie::Cookie;
use log::warn;

pub trait CookieStore {
    /// Deletes every cookie scoped to `path` on `domain`.
    fn delete_all(&mut self, path: &str, domain: &str);
}

/// Cookie deletions queued for an outgoing response.
///
/// A server only learns cookie names the browser sends it, and cookies
/// scoped to a deeper path are not sent to `/logout`. The store therefore
/// takes the names seen on the request plus the names the identity realm is
/// known to set.
#[derive(Debug, Default)]
pub struct ResponseCookies {
    names: Vec<String>,
    removals: Vec<Cookie<'static>>,
}

impl ResponseCookies {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names.into_iter().map(Into::into) {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self {
            names: unique,
            removals: Vec::new(),
        }
    }

    pub fn removals(&self) -> &[Cookie<'static>] {
        &self.removals
    }

    pub fn apply_to(&self, response: &mut HttpResponse) {
        for cookie in &self.removals {
            if let Err(e) = response.add_removal_cookie(cookie) {
                warn!("Failed to clear cookie {}: {e}", cookie.name());
            }
        }
    }
}

impl CookieStore for ResponseCookies {
    fn delete_all(&mut self, path: &str, domain: &str) {
        for name in &self.names {
            self.removals.push(
                Cookie::build(name.clone(), "")
                    .path(path.to_string())
                    .domain(domain.to_string())
                    .finish(),
            );
        }
    }
}
