//! Faker method names mapped onto `fake` generators.
//!
//! Method names follow the vocabulary users already write in `rules.ini`
//! (`first_name`, `email`, `date_time`, ...). Anything not listed here falls
//! back to a full name.

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use fake::faker::address::en::*;
use fake::faker::company::en::*;
use fake::faker::internet::en::*;
use fake::faker::lorem::en::*;
use fake::faker::name::en::*;
use fake::faker::phone_number::en::*;
use fake::Fake;
use rand::Rng;

use crate::generate::value::Value;

/// Every faker method with a dedicated generator.
pub const SUPPORTED_METHODS: &[&str] = &[
    "name",
    "first_name",
    "last_name",
    "user_name",
    "email",
    "safe_email",
    "free_email",
    "phone_number",
    "address",
    "street_address",
    "street_name",
    "city",
    "state",
    "country",
    "country_code",
    "zipcode",
    "postcode",
    "latitude",
    "longitude",
    "company",
    "job",
    "industry",
    "url",
    "domain_name",
    "ipv4",
    "mac_address",
    "user_agent",
    "word",
    "sentence",
    "paragraph",
    "text",
    "date",
    "date_time",
    "time",
    "year",
    "boolean",
    "uuid4",
    "random_int",
    "random_digit",
    "currency_code",
    "color_name",
];

pub fn is_supported(method: &str) -> bool {
    SUPPORTED_METHODS.contains(&method.trim().to_ascii_lowercase().as_str())
}

/// Generate one value for `method`, falling back to a full name.
pub fn fake_value(method: &str, rng: &mut impl Rng, row_index: usize) -> Value {
    fake_known(method, rng, row_index).unwrap_or_else(|| owned(Name().fake_with_rng(rng)))
}

#[inline]
fn owned(s: String) -> Value {
    Value::String(s)
}

fn pick(rng: &mut impl Rng, items: &[&str]) -> Value {
    Value::String(items[rng.random_range(0..items.len())].to_string())
}

/// Dates are drawn relative to a fixed anchor so a seed always produces the
/// same rows.
fn anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

fn random_date(rng: &mut impl Rng) -> NaiveDate {
    // 1970-01-01 up to the anchor.
    let span = (anchor_date() - NaiveDate::default()).num_days();
    NaiveDate::default() + ChronoDuration::days(rng.random_range(0..span))
}

fn random_time(rng: &mut impl Rng) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt(rng.random_range(0..86_400), 0)
        .unwrap_or_default()
}

fn fake_known(method: &str, rng: &mut impl Rng, row_index: usize) -> Option<Value> {
    let value = match method.trim().to_ascii_lowercase().as_str() {
        // === People ===
        "name" => owned(Name().fake_with_rng(rng)),
        "first_name" => owned(FirstName().fake_with_rng(rng)),
        "last_name" => owned(LastName().fake_with_rng(rng)),
        "user_name" => {
            let user: String = Username().fake_with_rng(rng);
            owned(format!("{}{}", user, row_index))
        }

        // === Contact ===
        "email" | "safe_email" => owned(SafeEmail().fake_with_rng(rng)),
        "free_email" => owned(FreeEmail().fake_with_rng(rng)),
        "phone_number" => owned(PhoneNumber().fake_with_rng(rng)),

        // === Address ===
        "address" => {
            let number = rng.random_range(1..9999);
            let street: String = StreetName().fake_with_rng(rng);
            let city: String = CityName().fake_with_rng(rng);
            let state: String = StateName().fake_with_rng(rng);
            let zip: String = ZipCode().fake_with_rng(rng);
            owned(format!("{} {}, {}, {} {}", number, street, city, state, zip))
        }
        "street_address" => {
            let number = rng.random_range(1..9999);
            let street: String = StreetName().fake_with_rng(rng);
            owned(format!("{} {}", number, street))
        }
        "street_name" => owned(StreetName().fake_with_rng(rng)),
        "city" => owned(CityName().fake_with_rng(rng)),
        "state" => owned(StateName().fake_with_rng(rng)),
        "country" => owned(CountryName().fake_with_rng(rng)),
        "country_code" => owned(CountryCode().fake_with_rng(rng)),
        "zipcode" | "postcode" => owned(ZipCode().fake_with_rng(rng)),
        "latitude" => {
            let lat: f64 = Latitude().fake_with_rng(rng);
            Value::Float(lat)
        }
        "longitude" => {
            let lon: f64 = Longitude().fake_with_rng(rng);
            Value::Float(lon)
        }

        // === Company ===
        "company" => owned(CompanyName().fake_with_rng(rng)),
        "job" => owned(Profession().fake_with_rng(rng)),
        "industry" => owned(Industry().fake_with_rng(rng)),

        // === Internet ===
        "url" => {
            let domain: String = DomainSuffix().fake_with_rng(rng);
            owned(format!("https://example-{}.{}", row_index, domain))
        }
        "domain_name" => owned(FreeEmailProvider().fake_with_rng(rng)),
        "ipv4" => owned(IPv4().fake_with_rng(rng)),
        "mac_address" => owned(MACAddress().fake_with_rng(rng)),
        "user_agent" => owned(UserAgent().fake_with_rng(rng)),

        // === Text ===
        "word" => {
            let words: Vec<String> = Words(1..2).fake_with_rng(rng);
            owned(words.join(" "))
        }
        "sentence" => owned(Sentence(5..12).fake_with_rng(rng)),
        "paragraph" => {
            let sentences: Vec<String> = Sentences(3..6).fake_with_rng(rng);
            owned(sentences.join(" "))
        }
        "text" => {
            let paragraphs: Vec<String> = Paragraphs(1..3).fake_with_rng(rng);
            owned(paragraphs.join("\n"))
        }

        // === Temporal ===
        "date" => owned(random_date(rng).format("%Y-%m-%d").to_string()),
        "date_time" => {
            let date = random_date(rng);
            let time = random_time(rng);
            owned(date.and_time(time).format("%Y-%m-%d %H:%M:%S").to_string())
        }
        "time" => owned(random_time(rng).format("%H:%M:%S").to_string()),
        "year" => owned(random_date(rng).format("%Y").to_string()),

        // === Misc ===
        "boolean" => pick(rng, &["True", "False"]),
        "uuid4" => {
            let hi: u64 = rng.random();
            let lo: u64 = rng.random();
            owned(format!(
                "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
                hi >> 32,
                (hi >> 16) & 0xffff,
                hi & 0x0fff,
                ((lo >> 48) & 0x3fff) | 0x8000,
                lo & 0xffff_ffff_ffff
            ))
        }
        "random_int" => Value::Int(rng.random_range(0..=9999)),
        "random_digit" => Value::Int(rng.random_range(0..=9)),
        "currency_code" => pick(rng, &["USD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF"]),
        "color_name" => pick(
            rng,
            &["Red", "Green", "Blue", "Yellow", "Purple", "Orange", "Black", "White"],
        ),
        _ => return None,
    };
    Some(value)
}
