//! Sign and verify round trips with a stub clear-sign oracle.

mod common;

use common::{TestEntity, TestKeyring, TEST_TIME};
use sif::integrity::{SignOpts, Signer, Verifier, VerifyOpts};
use sif::{
    create_container, CreateOpts, DataType, DescriptorInput, FsType, Link, PartType, SifError,
};
use std::io::Cursor;

fn two_partition_opts() -> CreateOpts {
    CreateOpts::new()
        .deterministic()
        .with_time(TEST_TIME)
        .with_descriptors(vec![
            DescriptorInput::new(DataType::Partition, Cursor::new(vec![0xfa, 0xce, 0xfe, 0xed]))
                .with_partition_metadata(FsType::Raw, PartType::System, "386")
                .unwrap(),
            DescriptorInput::new(DataType::Partition, Cursor::new(vec![0xde, 0xad, 0xbe, 0xef]))
                .with_partition_metadata(FsType::Squash, PartType::PrimSys, "386")
                .unwrap(),
        ])
}

fn sign_opts() -> SignOpts {
    SignOpts::new().deterministic().with_time(TEST_TIME)
}

#[test]
fn sign_verify_round_trip() {
    let entity = TestEntity::new(7);
    let mut image = create_container(Cursor::new(Vec::new()), two_partition_opts()).unwrap();

    Signer::new(&mut image, &entity, sign_opts())
        .unwrap()
        .sign()
        .unwrap();

    let signature = image.get_descriptor(3).unwrap();
    assert_eq!(signature.data_type(), DataType::CryptoMessage);
    assert_eq!(signature.link(), Link::Group(1));
    assert_eq!(signature.created_at(), TEST_TIME);

    let keyring = TestKeyring::new(vec![entity.clone()]);
    let result = Verifier::new(&mut image, &keyring, VerifyOpts::new())
        .verify()
        .unwrap();

    assert_eq!(result.verified, vec![1, 2]);
    assert_eq!(result.signatures.len(), 1);
    assert_eq!(result.signatures[0].id, 3);
    assert_eq!(result.signatures[0].fingerprint, entity.fingerprint());
}

#[test]
fn signing_is_deterministic() {
    let build = || {
        let entity = TestEntity::new(7);
        let mut image =
            create_container(Cursor::new(Vec::new()), two_partition_opts()).unwrap();
        Signer::new(&mut image, &entity, sign_opts())
            .unwrap()
            .sign()
            .unwrap();
        image.unload().unwrap().into_inner()
    };

    assert_eq!(build(), build());
}

#[test]
fn prior_signature_survives_benign_add() {
    let entity = TestEntity::new(7);
    let mut image = create_container(Cursor::new(Vec::new()), two_partition_opts()).unwrap();

    Signer::new(&mut image, &entity, sign_opts())
        .unwrap()
        .sign()
        .unwrap();

    // A benign add, then a targeted signature over only the new object.
    image
        .add_object(
            DescriptorInput::new(DataType::Generic, Cursor::new(vec![0x01, 0x02])).ungrouped(),
            sif::AddOpts::new().with_time(TEST_TIME).deterministic(),
        )
        .unwrap();
    Signer::new(&mut image, &entity, sign_opts().with_objects(&[4]))
        .unwrap()
        .sign()
        .unwrap();

    let keyring = TestKeyring::new(vec![entity]);
    let result = Verifier::new(&mut image, &keyring, VerifyOpts::new())
        .verify()
        .unwrap();

    // Both the original group signature and the targeted one still verify
    // over their original coverage.
    assert_eq!(result.verified, vec![1, 2, 4]);
    assert_eq!(result.signatures.len(), 2);
}

#[test]
fn tampered_object_is_detected() {
    let entity = TestEntity::new(7);
    let mut image = create_container(Cursor::new(Vec::new()), two_partition_opts()).unwrap();

    Signer::new(&mut image, &entity, sign_opts())
        .unwrap()
        .sign()
        .unwrap();

    // Flip one byte of object 2 by rewriting the container bytes.
    let offset = image.get_descriptor(2).unwrap().offset() as usize;
    let mut bytes = image.unload().unwrap().into_inner();
    bytes[offset] ^= 0xff;
    let mut image = sif::load_container(Cursor::new(bytes)).unwrap();

    let keyring = TestKeyring::new(vec![entity]);
    assert!(matches!(
        Verifier::new(&mut image, &keyring, VerifyOpts::new()).verify(),
        Err(SifError::DigestMismatch { id: 2 })
    ));
}

#[test]
fn unknown_entity_is_rejected() {
    let entity = TestEntity::new(7);
    let mut image = create_container(Cursor::new(Vec::new()), two_partition_opts()).unwrap();

    Signer::new(&mut image, &entity, sign_opts())
        .unwrap()
        .sign()
        .unwrap();

    let keyring = TestKeyring::new(vec![TestEntity::new(9)]);
    assert!(matches!(
        Verifier::new(&mut image, &keyring, VerifyOpts::new()).verify(),
        Err(SifError::SignatureInvalid(_))
    ));
}

#[test]
fn unsigned_container_has_no_signatures() {
    let mut image = create_container(Cursor::new(Vec::new()), two_partition_opts()).unwrap();
    let keyring = TestKeyring::new(vec![TestEntity::new(7)]);

    assert!(matches!(
        Verifier::new(&mut image, &keyring, VerifyOpts::new()).verify(),
        Err(SifError::SignatureNotFound)
    ));
}

#[test]
fn default_policy_covers_ungrouped_objects_individually() {
    let entity = TestEntity::new(7);
    let opts = CreateOpts::new()
        .deterministic()
        .with_time(TEST_TIME)
        .with_descriptors(vec![
            DescriptorInput::new(DataType::Generic, Cursor::new(vec![0x01])).ungrouped(),
            DescriptorInput::new(DataType::Generic, Cursor::new(vec![0x02])).ungrouped(),
        ]);
    let mut image = create_container(Cursor::new(Vec::new()), opts).unwrap();

    Signer::new(&mut image, &entity, sign_opts())
        .unwrap()
        .sign()
        .unwrap();

    // One signature per ungrouped object, each linked to its target.
    let links: Vec<Link> = image
        .descriptors()
        .filter(|d| d.data_type() == DataType::CryptoMessage)
        .map(|d| d.link())
        .collect();
    assert_eq!(links, vec![Link::Object(1), Link::Object(2)]);

    let keyring = TestKeyring::new(vec![entity]);
    let result = Verifier::new(&mut image, &keyring, VerifyOpts::new())
        .verify()
        .unwrap();
    assert_eq!(result.verified, vec![1, 2]);
}

#[test]
fn two_groups_get_one_signature_each() {
    let entity = TestEntity::new(7);
    let opts = CreateOpts::new()
        .deterministic()
        .with_time(TEST_TIME)
        .with_descriptors(vec![
            DescriptorInput::new(DataType::Partition, Cursor::new(vec![0xfa, 0xce]))
                .with_partition_metadata(FsType::Raw, PartType::System, "386")
                .unwrap(),
            DescriptorInput::new(DataType::Partition, Cursor::new(vec![0xba, 0xdd]))
                .with_partition_metadata(FsType::Ext3, PartType::System, "amd64")
                .unwrap()
                .with_group_id(2),
        ]);
    let mut image = create_container(Cursor::new(Vec::new()), opts).unwrap();

    Signer::new(&mut image, &entity, sign_opts())
        .unwrap()
        .sign()
        .unwrap();

    let links: Vec<Link> = image
        .descriptors()
        .filter(|d| d.data_type() == DataType::CryptoMessage)
        .map(|d| d.link())
        .collect();
    assert_eq!(links, vec![Link::Group(1), Link::Group(2)]);

    let keyring = TestKeyring::new(vec![entity]);
    let result = Verifier::new(&mut image, &keyring, VerifyOpts::new())
        .verify()
        .unwrap();
    assert_eq!(result.verified, vec![1, 2]);

    // Verification scoped to one group succeeds on its own.
    let result = Verifier::new(&mut image, &keyring, VerifyOpts::new().with_group(2))
        .verify()
        .unwrap();
    assert!(result.verified.contains(&2));
}

#[test]
fn verification_is_repeatable() {
    let entity = TestEntity::new(7);
    let mut image = create_container(Cursor::new(Vec::new()), two_partition_opts()).unwrap();

    Signer::new(&mut image, &entity, sign_opts())
        .unwrap()
        .sign()
        .unwrap();

    let keyring = TestKeyring::new(vec![entity]);
    for _ in 0..2 {
        let result = Verifier::new(&mut image, &keyring, VerifyOpts::new())
            .verify()
            .unwrap();
        assert_eq!(result.verified, vec![1, 2]);
    }
}
