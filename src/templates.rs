use askama::Template;

/// One label/value line of a staff mail.
#[derive(Debug, Clone)]
pub struct MailRow {
    pub label: &'static str,
    pub value: String,
}

impl MailRow {
    pub fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

#[derive(Template)]
#[template(path = "mail/staff_lead.html")]
pub struct StaffLeadMail<'a> {
    pub subject: &'a str,
    pub rows: Vec<MailRow>,
}

#[derive(Template)]
#[template(path = "mail/confirmation.html")]
pub struct ConfirmationMail<'a> {
    pub first_name: &'a str,
    pub request: &'a str,
    pub vehicle: &'a str,
}

#[derive(Template)]
#[template(path = "mail/modal_message.html")]
pub struct ModalMessageMail {
    pub rows: Vec<MailRow>,
}

#[derive(Template)]
#[template(path = "mail/financing.html")]
pub struct FinancingMail<'a> {
    pub reference: &'a str,
    pub rows: Vec<MailRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_values_are_escaped() {
        let html = StaffLeadMail {
            subject: "New lead",
            rows: vec![MailRow::new("Name", "<b>Ann</b>")],
        }
        .render()
        .expect("Failed to render");
        assert!(html.contains("&lt;b&gt;Ann&lt;/b&gt;"));
        assert!(!html.contains("<b>Ann</b>"));
        assert!(html.contains("<h2>New lead</h2>"));
    }

    #[test]
    fn subject_and_greeting_are_escaped() {
        let staff = StaffLeadMail {
            subject: "<script>x</script>",
            rows: Vec::new(),
        }
        .render()
        .expect("Failed to render");
        assert!(staff.contains("&lt;script&gt;x&lt;/script&gt;"));

        let confirmation = ConfirmationMail {
            first_name: "Ann & <i>Bo</i>",
            request: "inquiry",
            vehicle: "2021 Ford Mustang",
        }
        .render()
        .expect("Failed to render");
        assert!(confirmation.contains("Ann &amp; &lt;i&gt;Bo&lt;/i&gt;"));
    }

    #[test]
    fn multiline_values_keep_their_text() {
        let html = ModalMessageMail {
            rows: vec![MailRow::new("Message", "line one\nline two")],
        }
        .render()
        .expect("Failed to render");
        assert!(html.contains("line one\nline two"));
        assert!(html.contains("white-space: pre-wrap"));
    }
}
