//! HTML 메일 템플릿.

use p2a_core::config::{AppInfoConfig, MailConfig, EMAIL_VERIFICATION_TTL_HOURS};

/// 렌더링된 메일.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    /// 본문에 포함된 액션 링크 (있는 경우)
    pub link: Option<String>,
}

/// 메일 템플릿 렌더러.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    /// 서비스 표시 이름
    pub brand: String,
    /// 인증 링크 기본 URL
    pub verification_url: String,
    /// 애플리케이션 공개 URL
    pub app_url: String,
}

impl EmailTemplates {
    pub fn new(
        brand: impl Into<String>,
        verification_url: impl Into<String>,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            brand: brand.into(),
            verification_url: verification_url.into(),
            app_url: app_url.into(),
        }
    }

    pub fn from_config(mail: &MailConfig, app: &AppInfoConfig) -> Self {
        Self::new(&mail.from_name, &mail.verification_url, &app.url)
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!("{}?token={}", self.verification_url, token)
    }

    pub fn password_reset_link(&self, token: &str) -> String {
        format!(
            "{}/auth/reset-password?token={}",
            self.app_url.trim_end_matches('/'),
            token
        )
    }

    /// 이메일 인증 메일.
    pub fn verification(&self, name: &str, token: &str) -> RenderedEmail {
        let link = self.verification_link(token);
        let body = format!(
            "<p>Thanks for signing up. Please confirm your email address to activate your account.</p>\
             {button}\
             <p>Or paste this link into your browser:</p>\
             <p style=\"word-break:break-all;background:#e9ecef;padding:10px;border-radius:5px\">{link}</p>\
             <p><strong>Note:</strong> this link expires in {ttl} hours.</p>\
             <p>If you did not create this account, you can ignore this email.</p>",
            button = action_button(&link, "Verify email"),
            link = escape_html(&link),
            ttl = EMAIL_VERIFICATION_TTL_HOURS,
        );

        RenderedEmail {
            subject: format!("Verify your {} account", self.brand),
            html: self.layout(name, &body),
            link: Some(link),
        }
    }

    /// 가입 환영 메일.
    pub fn welcome(&self, name: &str) -> RenderedEmail {
        let body = format!(
            "<p>Your email has been verified. Welcome to {brand}!</p>\
             <p>You can now sign in and complete your profile.</p>\
             {button}",
            brand = escape_html(&self.brand),
            button = action_button(&self.app_url, "Open the platform"),
        );

        RenderedEmail {
            subject: format!("Welcome to {}!", self.brand),
            html: self.layout(name, &body),
            link: None,
        }
    }

    /// 비밀번호 재설정 메일.
    pub fn password_reset(&self, name: &str, token: &str) -> RenderedEmail {
        let link = self.password_reset_link(token);
        let body = format!(
            "<p>We received a request to reset your password.</p>\
             {button}\
             <p>This link expires in 1 hour. If you did not request a reset, no action is needed.</p>",
            button = action_button(&link, "Reset password"),
        );

        RenderedEmail {
            subject: format!("Reset your {} password", self.brand),
            html: self.layout(name, &body),
            link: Some(link),
        }
    }

    fn layout(&self, name: &str, body: &str) -> String {
        format!(
            "<!DOCTYPE html>\
             <html><head><meta charset=\"utf-8\"></head>\
             <body style=\"font-family:Arial,sans-serif;line-height:1.6;color:#333\">\
             <div style=\"max-width:600px;margin:0 auto;padding:20px\">\
             <div style=\"background:#667eea;color:#fff;padding:30px;text-align:center;border-radius:10px 10px 0 0\">\
             <h1>{brand}</h1></div>\
             <div style=\"background:#f9f9f9;padding:30px;border-radius:0 0 10px 10px\">\
             <h2>Hello {name}!</h2>{body}</div>\
             <div style=\"text-align:center;margin-top:20px;color:#666;font-size:12px\">\
             <p>This is an automated message, please do not reply.</p></div>\
             </div></body></html>",
            brand = escape_html(&self.brand),
            name = escape_html(name),
            body = body,
        )
    }
}

fn action_button(href: &str, label: &str) -> String {
    format!(
        "<div style=\"text-align:center\"><a href=\"{}\" \
         style=\"display:inline-block;padding:12px 30px;background:#667eea;color:#fff;\
         text-decoration:none;border-radius:5px;margin:20px 0\">{}</a></div>",
        escape_html(href),
        label
    )
}

/// HTML 특수문자를 이스케이프합니다.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
