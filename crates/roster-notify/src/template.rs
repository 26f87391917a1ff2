//! Email templates for member lifecycle events.
//!
//! Every interpolated member field is HTML-escaped; registrants control
//! their own name and category.

use roster_core::{
  event::MemberEvent,
  member::{Member, MemberKind, MembershipType},
};

use crate::MailMessage;

/// Organisation details shared by every template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
  pub org_name: String,
  /// Site root used for links, without a trailing slash.
  pub base_url: String,
}

impl Templates {
  pub fn new(org_name: impl Into<String>, base_url: impl Into<String>) -> Self {
    let base_url: String = base_url.into();
    Self {
      org_name: org_name.into(),
      base_url: base_url.trim_end_matches('/').to_owned(),
    }
  }

  pub fn render(&self, event: &MemberEvent) -> MailMessage {
    match event {
      MemberEvent::Registered(m) => self.welcome(m),
      MemberEvent::PaymentConfirmed(m) => self.confirmed(m),
      MemberEvent::PaymentRejected(m) => self.rejected(m),
    }
  }

  fn welcome(&self, m: &Member) -> MailMessage {
    let org = &self.org_name;
    let grade = match m.kind {
      MemberKind::Student => "Student Member",
      MemberKind::NonStudent => "Associate Member",
    };
    let category_label = match m.kind {
      MemberKind::Student => "Course",
      MemberKind::NonStudent => "Area of Interest",
    };
    let rows = [
      ("Name", m.name.as_str()),
      ("Email", m.email.as_str()),
      ("Phone", m.phone.as_str()),
      (category_label, m.category.as_deref().unwrap_or("-")),
    ];

    let mut html = format!(
      "<h1>Welcome to {org}!</h1>\n<p>Hello {name},</p>\n<p>Thank you for \
       registering with {org} as a <strong>{grade}</strong>.</p>\n",
      org = escape(org),
      name = escape(&m.name),
    );
    html.push_str(&details_table("Registration Details", &rows));
    html.push_str(
      "<p><strong>Payment pending:</strong> once your payment is verified you \
       will receive your membership number by email.</p>\n",
    );
    html.push_str(&self.footer(&m.email));

    let mut text = format!(
      "Welcome to {org}!\n\nHello {name},\n\nThank you for registering with \
       {org} as a {grade}.\n\n",
      name = m.name,
    );
    details_text(&mut text, &rows);
    text.push_str(
      "\nPayment pending: once your payment is verified you will receive \
       your membership number by email.\n",
    );

    MailMessage {
      to:      m.email.clone(),
      subject: format!("Welcome to {org} - Registration Received"),
      html,
      text,
    }
  }

  fn confirmed(&self, m: &Member) -> MailMessage {
    let org = &self.org_name;
    let number = m.member_number.as_deref().unwrap_or("Pending Assignment");
    let tier = match m.membership_type {
      MembershipType::Pending | MembershipType::Ordinary => "Ordinary",
      MembershipType::Associate => "Associate",
      MembershipType::Honorary => "Honorary",
    };
    let rows = [
      ("Name", m.name.as_str()),
      ("Email", m.email.as_str()),
      ("Membership Type", tier),
      ("Status", "Active"),
    ];

    let mut html = format!(
      "<h1>Payment Confirmed!</h1>\n<p>Congratulations, {name}!</p>\n<p>Your \
       payment has been verified and your {org} membership is now \
       <strong>active</strong>.</p>\n<p>Your member number: \
       <strong>{number}</strong></p>\n",
      name = escape(&m.name),
      org = escape(org),
      number = escape(number),
    );
    html.push_str(&details_table("Membership Details", &rows));
    html.push_str(&self.footer(&m.email));

    let mut text = format!(
      "Payment Confirmed!\n\nCongratulations, {name}!\n\nYour payment has \
       been verified and your {org} membership is now active.\n\nYour member \
       number: {number}\n\n",
      name = m.name,
    );
    details_text(&mut text, &rows);

    MailMessage {
      to:      m.email.clone(),
      subject: format!("{org} Membership Confirmed - {number}"),
      html,
      text,
    }
  }

  fn rejected(&self, m: &Member) -> MailMessage {
    let org = &self.org_name;
    let reasons = [
      "Incorrect payment reference or transaction code",
      "Insufficient payment amount",
      "Payment made to the wrong account",
    ];

    let mut html = format!(
      "<h1>Payment Issue</h1>\n<p>Hello {name},</p>\n<p>We were unable to \
       verify your payment for {org} membership registration (reference \
       <code>{reference}</code>).</p>\n<p>Possible reasons:</p>\n<ul>\n",
      name = escape(&m.name),
      org = escape(org),
      reference = escape(&m.payment_reference),
    );
    for reason in reasons {
      html.push_str(&format!("<li>{reason}</li>\n"));
    }
    html.push_str("</ul>\n<p>Please contact us with your correct payment details.</p>\n");
    html.push_str(&self.footer(&m.email));

    let mut text = format!(
      "Payment Issue\n\nHello {name},\n\nWe were unable to verify your \
       payment for {org} membership registration (reference {reference}).\n\n\
       Possible reasons:\n",
      name = m.name,
      reference = m.payment_reference,
    );
    for reason in reasons {
      text.push_str(&format!("  - {reason}\n"));
    }
    text.push_str("\nPlease contact us with your correct payment details.\n");

    MailMessage {
      to:      m.email.clone(),
      subject: format!("{org} Registration - Payment Verification Issue"),
      html,
      text,
    }
  }

  fn footer(&self, email: &str) -> String {
    format!(
      "<hr>\n<p><small>You received this email because you registered with \
       {org}. <a href=\"{base}\">Website</a> | <a \
       href=\"{base}/privacy\">Privacy Policy</a> | <a \
       href=\"{base}/unsubscribe?email={email}\">Unsubscribe</a></small></p>\n",
      org = escape(&self.org_name),
      base = escape(&self.base_url),
      email = escape(&urlencoding::encode(email)),
    )
  }
}

fn details_table(title: &str, rows: &[(&str, &str)]) -> String {
  let mut out = format!("<h3>{title}</h3>\n<table>\n");
  for (label, value) in rows {
    out.push_str(&format!(
      "<tr><td>{}:</td><td>{}</td></tr>\n",
      escape(label),
      escape(value)
    ));
  }
  out.push_str("</table>\n");
  out
}

fn details_text(out: &mut String, rows: &[(&str, &str)]) {
  for (label, value) in rows {
    out.push_str(&format!("{label}: {value}\n"));
  }
}

/// Escape the five characters significant in HTML text and attributes.
fn escape(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use roster_core::member::PaymentStatus;
  use uuid::Uuid;

  use super::*;

  fn templates() -> Templates { Templates::new("AECAS", "https://aecas.example/") }

  fn member() -> Member {
    let now = Utc::now();
    Member {
      member_id:           Uuid::new_v4(),
      name:                "Amina <b>Otieno</b>".into(),
      email:               "amina+1@example.com".into(),
      phone:               "254712345678".into(),
      kind:                MemberKind::Student,
      category:            Some("CE".into()),
      registration_number: None,
      membership_type:     MembershipType::Pending,
      payment_reference:   "QX12AB".into(),
      payment_status:      PaymentStatus::Pending,
      member_number:       None,
      registration_date:   now,
      last_updated:        now,
    }
  }

  #[test]
  fn welcome_escapes_member_fields() {
    let msg = templates().render(&MemberEvent::Registered(member()));
    assert_eq!(msg.to, "amina+1@example.com");
    assert!(msg.subject.contains("Registration Received"));
    assert!(msg.html.contains("Amina &lt;b&gt;Otieno&lt;/b&gt;"));
    assert!(!msg.html.contains("<b>Otieno"));
    assert!(msg.html.contains("Student Member"));
    assert!(msg.html.contains("<td>Course:</td><td>CE</td>"));
    // Plain text is not escaped.
    assert!(msg.text.contains("Hello Amina <b>Otieno</b>,"));
  }

  #[test]
  fn welcome_labels_non_students() {
    let mut m = member();
    m.kind = MemberKind::NonStudent;
    m.category = Some("Quantity surveying".into());
    let msg = templates().render(&MemberEvent::Registered(m));
    assert!(msg.html.contains("Associate Member"));
    assert!(msg.text.contains("Area of Interest: Quantity surveying"));
  }

  #[test]
  fn confirmation_carries_the_number() {
    let mut m = member();
    m.payment_status = PaymentStatus::Confirmed;
    m.member_number = Some("AECAS/CE/007".into());
    let msg = templates().render(&MemberEvent::PaymentConfirmed(m));
    assert_eq!(msg.subject, "AECAS Membership Confirmed - AECAS/CE/007");
    assert!(msg.html.contains("<strong>AECAS/CE/007</strong>"));
    assert!(msg.text.contains("Membership Type: Ordinary"));
  }

  #[test]
  fn rejection_quotes_the_reference() {
    let msg = templates().render(&MemberEvent::PaymentRejected(member()));
    assert!(msg.html.contains("<code>QX12AB</code>"));
    assert!(msg.text.contains("  - Insufficient payment amount"));
  }

  #[test]
  fn footer_links_use_trimmed_base_and_encoded_email() {
    let msg = templates().render(&MemberEvent::Registered(member()));
    assert!(msg.html.contains("https://aecas.example/privacy"));
    assert!(
      msg
        .html
        .contains("https://aecas.example/unsubscribe?email=amina%2B1%40example.com")
    );
  }
}
