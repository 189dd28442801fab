use chrono::NaiveDate;
use gym_portal::services::qr_service::QrError;
use gym_portal::services::QrSigner;
use proptest::prelude::*;
use uuid::Uuid;

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2035, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

proptest! {
    #[test]
    fn issued_payload_verifies_only_on_its_day(
        secret in "[a-zA-Z0-9]{8,40}",
        raw_id in any::<u128>(),
        issued in date_strategy(),
        offset in 1i64..400,
    ) {
        let signer = QrSigner::new(&secret);
        let member = Uuid::from_u128(raw_id);
        let raw = signer.issue_json(member, issued).unwrap();

        let payload = signer.verify(&raw, issued).unwrap();
        prop_assert_eq!(payload.member_id, member);

        let later = issued + chrono::Duration::days(offset);
        prop_assert_eq!(signer.verify(&raw, later), Err(QrError::Expired));
    }

    #[test]
    fn flipped_signature_digit_is_rejected(
        raw_id in any::<u128>(),
        issued in date_strategy(),
        position in 0usize..64,
    ) {
        let signer = QrSigner::new("front-desk-secret");
        let mut payload = signer.issue(Uuid::from_u128(raw_id), issued);

        let mut digits: Vec<char> = payload.signature.chars().collect();
        digits[position] = if digits[position] == '0' { '1' } else { '0' };
        payload.signature = digits.into_iter().collect();

        let raw = serde_json::to_string(&payload).unwrap();
        prop_assert_eq!(signer.verify(&raw, issued), Err(QrError::InvalidSignature));
    }
}
