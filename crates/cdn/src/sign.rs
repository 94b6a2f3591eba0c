use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use exn::ResultExt;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::error::{ErrorKind, Result};

type HmacSha1 = Hmac<Sha1>;

// RFC 1123, as sent in `x-amz-date`.
const HTTP_DATE: &[BorrowedFormatItem<'_>] =
    format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");

pub(crate) fn http_date(now: OffsetDateTime) -> Result<String> {
    now.to_offset(UtcOffset::UTC)
        .format(HTTP_DATE)
        .or_raise(|| ErrorKind::Signing("date is not representable".to_string()))
}

/// `base64(HMAC-SHA1(secret, date))`
pub(crate) fn signature(secret: &str, date: &str) -> Result<String> {
    let Ok(mut mac) = HmacSha1::new_from_slice(secret.as_bytes()) else {
        exn::bail!(ErrorKind::Signing("secret key rejected".to_string()));
    };
    mac.update(date.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

pub(crate) fn authorization(access_key_id: &str, signature: &str) -> String {
    format!("AWS {access_key_id}:{signature}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1_700_000_000, "Tue, 14 Nov 2023 22:13:20 GMT")]
    #[case(1_736_067_787, "Sun, 05 Jan 2025 09:03:07 GMT")]
    fn test_http_date(#[case] unix: i64, #[case] expected: &str) {
        let now = OffsetDateTime::from_unix_timestamp(unix).unwrap();
        assert_eq!(http_date(now).unwrap(), expected);
    }

    #[test]
    fn test_http_date_converts_offset() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000)
            .unwrap()
            .to_offset(UtcOffset::from_hms(2, 0, 0).unwrap());
        assert_eq!(http_date(now).unwrap(), "Tue, 14 Nov 2023 22:13:20 GMT");
    }

    #[rstest]
    #[case("wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY", "Tue, 14 Nov 2023 22:13:20 GMT", "9J5NqX9F8Afjq0AM02Oe05fTVak=")]
    #[case("secret", "Sun, 05 Jan 2025 09:03:07 GMT", "VaIAt9zov4q2qQMq9Xzwm8cK+SY=")]
    fn test_signature(#[case] secret: &str, #[case] date: &str, #[case] expected: &str) {
        assert_eq!(signature(secret, date).unwrap(), expected);
    }

    #[test]
    fn test_authorization() {
        assert_eq!(authorization("AKID", "c2lnbg=="), "AWS AKID:c2lnbg==");
    }
}
