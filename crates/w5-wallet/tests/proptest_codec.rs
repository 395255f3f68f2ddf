use proptest::prelude::*;

use w5_cell::MsgAddress;
use w5_crypto::Ed25519Keypair;
use w5_wallet::{
    build_external_request, build_wallet_actions, parse_wallet_actions, ExtendedAction,
    RequestMessage, WalletActions, WalletId,
};

fn internal_address() -> impl Strategy<Value = MsgAddress> {
    (any::<i8>(), any::<[u8; 32]>()).prop_map(|(workchain, address)| MsgAddress::Internal {
        workchain: workchain as i32,
        address,
    })
}

fn extended_action() -> impl Strategy<Value = ExtendedAction> {
    prop_oneof![
        internal_address().prop_map(ExtendedAction::add_extension),
        internal_address().prop_map(ExtendedAction::remove_extension),
        any::<bool>().prop_map(ExtendedAction::set_signature_auth),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn wallet_id_roundtrip(
        network in any::<i32>(),
        workchain in any::<i8>(),
        subwallet in 0u32..(1 << 15),
    ) {
        let id = WalletId::client(network, workchain as i32, subwallet).unwrap();
        let raw = id.encode().unwrap();
        prop_assert_eq!(WalletId::decode(raw, network).unwrap(), id);
    }

    #[test]
    fn wallet_id_network_isolation(
        a in any::<i32>(),
        b in any::<i32>(),
        workchain in any::<i8>(),
        subwallet in 0u32..(1 << 15),
    ) {
        prop_assume!(a != b);
        let id_a = WalletId::client(a, workchain as i32, subwallet).unwrap();
        let id_b = WalletId::client(b, workchain as i32, subwallet).unwrap();
        prop_assert_ne!(id_a.encode().unwrap(), id_b.encode().unwrap());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn extended_chain_preserves_order(actions in prop::collection::vec(extended_action(), 1..24)) {
        let cell = build_wallet_actions(&WalletActions::new().with_extended(actions.clone())).unwrap();
        let decoded = parse_wallet_actions(&cell).unwrap();
        prop_assert!(decoded.out_actions.is_empty());
        prop_assert_eq!(decoded.extended, actions);
    }

    #[test]
    fn empty_lists_serialize_as_absent(
        wallet_id in any::<i32>(),
        valid_until in any::<u32>(),
        seqno in any::<u32>(),
    ) {
        let absent = build_external_request(wallet_id, valid_until, seqno, WalletActions::new(), None).unwrap();
        let empty = build_external_request(
            wallet_id,
            valid_until,
            seqno,
            WalletActions::new().with_out_actions(vec![]).with_extended(vec![]),
            None,
        )
        .unwrap();
        prop_assert_eq!(&absent, &empty);
        prop_assert_eq!(absent.bit_len(), 32 * 4 + 2);
        prop_assert_eq!(absent.get_bit(128), Some(false));
        prop_assert_eq!(absent.get_bit(129), Some(false));
        prop_assert_eq!(absent.reference_count(), 0);
    }

    #[test]
    fn signature_is_appended(
        seed in any::<[u8; 32]>(),
        seqno in any::<u32>(),
        actions in prop::collection::vec(extended_action(), 0..4),
    ) {
        let keypair = Ed25519Keypair::from_private_key(seed);
        let batch = WalletActions::new().with_extended(actions);
        let unsigned = build_external_request(7, u32::MAX, seqno, batch.clone(), None).unwrap();
        let signed = build_external_request(7, u32::MAX, seqno, batch, Some(&keypair)).unwrap();

        prop_assert_eq!(signed.bit_len(), unsigned.bit_len() + 512);
        for i in 0..unsigned.bit_len() {
            prop_assert_eq!(signed.get_bit(i), unsigned.get_bit(i));
        }

        let parsed = RequestMessage::parse(&signed).unwrap();
        prop_assert_eq!(parsed.signing_hash(), unsigned.hash());
        prop_assert!(parsed.verify(&keypair.public_key).is_ok());
    }
}
