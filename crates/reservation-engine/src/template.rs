//! `{{token}}` substitution for guest messages.
//!
//! Recognized tokens: `{{guestName}}`, `{{partySize}}`, `{{date}}`, `{{time}}`,
//! `{{restaurantName}}`. Anything else, including an unterminated `{{`, is
//! copied through verbatim.

use crate::reservation::Reservation;
use crate::time_format::{DATE_FORMAT, TIME_FORMAT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVars {
    pub guest_name: String,
    pub party_size: u32,
    pub date: String,
    pub time: String,
    pub restaurant_name: String,
}

impl TemplateVars {
    pub fn for_reservation(reservation: &Reservation, restaurant_name: &str) -> Self {
        Self {
            guest_name: reservation.guest_name.clone(),
            party_size: reservation.party_size,
            date: reservation.date.format(DATE_FORMAT).to_string(),
            time: reservation.time.format(TIME_FORMAT).to_string(),
            restaurant_name: restaurant_name.to_string(),
        }
    }

    fn lookup(&self, token: &str) -> Option<String> {
        match token {
            "guestName" => Some(self.guest_name.clone()),
            "partySize" => Some(self.party_size.to_string()),
            "date" => Some(self.date.clone()),
            "time" => Some(self.time.clone()),
            "restaurantName" => Some(self.restaurant_name.clone()),
            _ => None,
        }
    }
}

pub fn render(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        let token = &after_open[..close];
        // A nested `{{` starts a new token; the text before it is literal.
        if let Some(inner) = token.find("{{") {
            out.push_str("{{");
            out.push_str(&token[..inner]);
            rest = &after_open[inner..];
            continue;
        }
        match vars.lookup(token.trim()) {
            Some(value) => out.push_str(&value),
            None => {
                out.push_str("{{");
                out.push_str(token);
                out.push_str("}}");
            }
        }
        rest = &after_open[close + 2..];
    }

    // Either no more tokens or an unterminated `{{`; keep the tail as is.
    if let Some(open) = rest.find("{{") {
        out.push_str(&rest[open..]);
    } else {
        out.push_str(rest);
    }
    out
}
