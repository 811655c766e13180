use bitcoin_hashes::{sha256, Hash};
use htlcgate_service_api::payment::Preimage;
use lightning_invoice::{Currency, InvoiceBuilder, PaymentSecret};
use secp256k1_0_29::{Secp256k1, SecretKey};
use std::time::SystemTime;

fn signing_key() -> SecretKey {
    SecretKey::from_slice(
        &[
            0xe1, 0x26, 0xf6, 0x8f, 0x7e, 0xaf, 0xcc, 0x8b, 0x74, 0xf5, 0x4d, 0x26, 0x9f, 0xe2,
            0x06, 0xbe, 0x71, 0x50, 0x00, 0xf9, 0x4d, 0xac, 0x06, 0x7d, 0x1c, 0x04, 0xa8, 0xca,
            0x3b, 0x2d, 0xb7, 0x34,
        ][..],
    )
    .unwrap()
}

pub fn signed_invoice(
    preimage: &Preimage,
    amount_msat: Option<u64>,
    timestamp: SystemTime,
) -> String {
    let private_key = signing_key();

    let builder = InvoiceBuilder::new(Currency::Bitcoin)
        .description("desc".into())
        .payment_hash(sha256::Hash::from_byte_array(preimage.payment_hash().0))
        .payment_secret(PaymentSecret([42u8; 32]))
        .timestamp(timestamp)
        .min_final_cltv_expiry_delta(144);

    let builder = match amount_msat {
        Some(amount_msat) => builder.amount_milli_satoshis(amount_msat),
        None => builder,
    };

    builder
        .build_signed(|hash| Secp256k1::new().sign_ecdsa_recoverable(hash, &private_key))
        .unwrap()
        .to_string()
}

pub fn invoice(preimage: &Preimage, amount_msat: u64) -> String {
    signed_invoice(preimage, Some(amount_msat), SystemTime::now())
}
