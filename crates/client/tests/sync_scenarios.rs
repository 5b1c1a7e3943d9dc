//! # Integration Tests — SuperlightClient
//!
//! End-to-end sync scenarios over in-memory provers: honest pools,
//! forged chains, structural misbehavior, and the fatal paths. Game
//! complexity is pinned through the call-counting wrapper: a bisection
//! never queries more nodes than the disputed tree's depth.

use std::sync::Arc;

use slv_client::{
    ClientError, CountingProver, MmrInfo, MockProver, Prover, SuperlightClient,
};
use slv_common::ClientConfig;
use slv_mmr::Peak;
use slv_store::ChainFixture;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn counting(prover: MockProver) -> Arc<CountingProver<MockProver>> {
    Arc::new(CountingProver::new(prover))
}

fn client(
    provers: Vec<Arc<dyn Prover>>,
    fixture: &ChainFixture,
) -> SuperlightClient<slv_store::MemoryStore> {
    SuperlightClient::new(ClientConfig::default(), provers, fixture.store())
}

// ── HONEST POOLS ────────────────────────────────────────────────────

#[tokio::test]
async fn single_honest_prover_adopts_the_tip_committee() {
    init_tracing();
    let fixture = ChainFixture::generate(4, 4, 0x51);
    let prover = counting(MockProver::new(&fixture, 2));

    let records = client(vec![prover.clone()], &fixture)
        .sync()
        .await
        .expect("sync");

    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].sync_committee.as_ref(),
        fixture.committee(3)
    );
    // no disagreement, no games
    assert_eq!(prover.node_calls(), 0);
    assert_eq!(prover.info_calls(), 1);
}

#[tokio::test]
async fn identical_provers_pool_without_playing() {
    init_tracing();
    let fixture = ChainFixture::generate(6, 4, 0x52);
    let first = counting(MockProver::new(&fixture, 2));
    let second = counting(MockProver::new(&fixture, 2));

    let records = client(vec![first.clone(), second.clone()], &fixture)
        .sync()
        .await
        .expect("sync");

    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.sync_committee.as_ref(), fixture.committee(5));
    }
    assert_eq!(first.node_calls(), 0);
    assert_eq!(second.node_calls(), 0);
}

// ── FORGED CHAINS ───────────────────────────────────────────────────

#[tokio::test]
async fn genesis_leaf_disagreement_settled_against_the_known_committee() {
    init_tracing();
    let honest = ChainFixture::generate(1, 4, 0x53);
    let forged = honest.fork(0, 0x54);

    // single-leaf accumulator: the game is pure genesis comparison
    for honest_first in [true, false] {
        let a = counting(MockProver::new(&honest, 2));
        let b = counting(MockProver::new(&forged, 2));
        let provers: Vec<Arc<dyn Prover>> = if honest_first {
            vec![a.clone(), b.clone()]
        } else {
            vec![b.clone(), a.clone()]
        };

        let records = client(provers, &honest).sync().await.expect("sync");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].sync_committee.as_ref(),
            honest.committee(0)
        );
        // depth-0 tree: bisection asks for no nodes at all
        assert_eq!(a.node_calls(), 0);
        assert_eq!(b.node_calls(), 0);
    }
}

#[tokio::test]
async fn deep_dispute_resolved_by_fraud_proof() {
    init_tracing();
    let honest = ChainFixture::generate(8, 4, 0x55);
    let forged = honest.fork(5, 0x56);

    let a = counting(MockProver::new(&honest, 2));
    let b = counting(MockProver::new(&forged, 2));

    let records = client(vec![a.clone(), b.clone()], &honest)
        .sync()
        .await
        .expect("sync");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 0);
    assert_eq!(
        records[0].sync_committee.as_ref(),
        honest.committee(7)
    );

    // one peak of 8 leaves: exactly depth-many node queries per side
    assert_eq!(a.node_calls(), 3);
    assert_eq!(b.node_calls(), 3);
    // disputed leaf + previous leaf + final latest audit for the winner
    assert_eq!(a.leaf_calls(), 3);
    assert_eq!(b.leaf_calls(), 1);
    assert_eq!(a.update_calls(), 1);
    assert_eq!(b.update_calls(), 1);
}

#[tokio::test]
async fn forged_chain_loses_regardless_of_seating() {
    init_tracing();
    let honest = ChainFixture::generate(8, 4, 0x57);
    let forged = honest.fork(2, 0x58);

    let a = Arc::new(MockProver::new(&forged, 2));
    let b = Arc::new(MockProver::new(&honest, 2));

    let records = client(vec![a, b], &honest).sync().await.expect("sync");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 1);
    assert_eq!(
        records[0].sync_committee.as_ref(),
        honest.committee(7)
    );
}

#[tokio::test]
async fn tournament_of_three_with_one_honest_member() {
    init_tracing();
    let honest = ChainFixture::generate(8, 4, 0x59);
    let forged_early = honest.fork(1, 0x5A);
    let forged_late = honest.fork(6, 0x5B);

    let provers: Vec<Arc<dyn Prover>> = vec![
        Arc::new(MockProver::new(&forged_early, 2)),
        Arc::new(MockProver::new(&honest, 2)),
        Arc::new(MockProver::new(&forged_late, 2)),
    ];

    let records = client(provers, &honest).sync().await.expect("sync");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 1);
    assert_eq!(
        records[0].sync_committee.as_ref(),
        honest.committee(7)
    );
}

// ── STRUCTURAL MISBEHAVIOR ──────────────────────────────────────────

#[tokio::test]
async fn malformed_node_expansion_loses_without_descending() {
    init_tracing();
    let honest = ChainFixture::generate(8, 4, 0x5C);
    let forged = honest.fork(5, 0x5D);

    let a = counting(MockProver::new(&honest, 2));
    let b = counting(MockProver::new(&forged, 2).with_corrupt_nodes());

    let records = client(vec![a.clone(), b.clone()], &honest)
        .sync()
        .await
        .expect("sync");

    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].sync_committee.as_ref(),
        honest.committee(7)
    );
    // the first corrupt answer ends the game
    assert_eq!(a.node_calls(), 1);
    assert_eq!(b.node_calls(), 1);
    assert_eq!(b.leaf_calls(), 0);
}

#[tokio::test]
async fn fabricated_accumulator_claim_fails_the_audit() {
    init_tracing();
    let fixture = ChainFixture::generate(4, 4, 0x5E);
    let honest = Arc::new(MockProver::new(&fixture, 2));
    let liar = Arc::new(MockProver::new(&fixture, 2).with_claimed_info(MmrInfo {
        root: slv_common::hash(b"no such accumulator"),
        peaks: vec![Peak {
            root: slv_common::hash(b"no such peak"),
            size: 4,
        }],
    }));

    let records = client(vec![liar, honest], &fixture)
        .sync()
        .await
        .expect("sync");

    // the liar never reaches the tournament
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 1);
}

#[tokio::test]
async fn wrong_fanout_prover_fails_the_audit() {
    init_tracing();
    let fixture = ChainFixture::generate(4, 4, 0x5F);
    let honest = Arc::new(MockProver::new(&fixture, 2));
    let quaternary = Arc::new(MockProver::new(&fixture, 4));

    let records = client(vec![quaternary, honest], &fixture)
        .sync()
        .await
        .expect("sync");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 1);
}

// ── FATAL PATHS ─────────────────────────────────────────────────────

#[tokio::test]
async fn empty_prover_set_is_fatal() {
    init_tracing();
    let fixture = ChainFixture::generate(4, 4, 0x60);
    let result = client(Vec::new(), &fixture).sync().await;
    assert!(matches!(result, Err(ClientError::NoHonestProver)));
}

#[tokio::test]
async fn all_audit_failures_are_fatal() {
    init_tracing();
    let fixture = ChainFixture::generate(4, 4, 0x61);
    let liar = Arc::new(MockProver::new(&fixture, 2).with_claimed_info(MmrInfo {
        root: slv_common::hash(b"junk"),
        peaks: Vec::new(),
    }));

    let result = client(vec![liar], &fixture).sync().await;
    assert!(matches!(result, Err(ClientError::NoHonestProver)));
}

#[tokio::test]
async fn all_winners_cheating_on_the_latest_leaf_is_fatal() {
    init_tracing();
    let base = ChainFixture::generate(8, 4, 0x62);
    // no honest prover: two different forgeries, the survivor of their
    // game refuses to prove its rightmost leaf
    let forged_early = base.fork(3, 0x63);
    let forged_late = base.fork(5, 0x64);

    let a = Arc::new(MockProver::new(&forged_early, 2));
    let b = Arc::new(MockProver::new(&forged_late, 2).with_broken_latest_proof());

    let result = client(vec![a, b], &base).sync().await;
    assert!(matches!(result, Err(ClientError::AllWinnersCheated)));
}

#[tokio::test]
async fn equivocation_at_the_disputed_leaf_aborts() {
    init_tracing();
    let honest = ChainFixture::generate(8, 4, 0x65);
    let forged = honest.fork(5, 0x66);

    // committee 4 "signs" both successors: its real one and the forgery
    let next = forged.committee(5).expect("forged period 5");
    let equivocation = honest.sign_update_with(4, next).expect("signer period 4");

    let a = Arc::new(MockProver::new(&honest, 2));
    let b = Arc::new(MockProver::new(&forged, 2).with_update_override(4, equivocation));

    let result = client(vec![a, b], &honest).sync().await;
    assert!(matches!(result, Err(ClientError::InvariantViolation(_))));
}

// ── DEGRADED POOLS ──────────────────────────────────────────────────

#[tokio::test]
async fn without_an_honest_prover_the_survivor_is_unconstrained() {
    init_tracing();
    let base = ChainFixture::generate(4, 4, 0x67);
    let forged_a = base.fork(3, 0x68);
    let forged_b = base.fork(3, 0x69);

    let a = Arc::new(MockProver::new(&forged_a, 2));
    let b = Arc::new(MockProver::new(&forged_b, 2));

    // both fraud checks fail at the disputed leaf; the challenger is
    // kept, and nothing unseats it later — the honest-minority
    // assumption is violated, so the result is self-consistent garbage
    let records = client(vec![a, b], &base).sync().await.expect("sync");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 1);
    assert_eq!(
        records[0].sync_committee.as_ref(),
        forged_b.committee(3)
    );
}

// ── CONFIGURATION ───────────────────────────────────────────────────

#[tokio::test]
async fn nonzero_genesis_period_translates_leaf_indices() {
    init_tracing();
    let honest = ChainFixture::generate_from(10, 4, 4, 0x6A);
    let forged = honest.fork(12, 0x6B);

    let a = Arc::new(MockProver::new(&honest, 2));
    let b = Arc::new(MockProver::new(&forged, 2));

    let records = client(vec![a, b], &honest).sync().await.expect("sync");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 0);
    assert_eq!(
        records[0].sync_committee.as_ref(),
        honest.committee(13)
    );
}

#[tokio::test]
async fn quaternary_trees_bisect_in_log4_rounds() {
    init_tracing();
    let honest = ChainFixture::generate(16, 4, 0x6C);
    let forged = honest.fork(9, 0x6D);

    let a = counting(MockProver::new(&honest, 4));
    let b = counting(MockProver::new(&forged, 4));

    let config = ClientConfig {
        fanout: Some(4),
        max_provers: None,
    };
    let client = SuperlightClient::new(
        config,
        vec![a.clone() as Arc<dyn Prover>, b.clone()],
        honest.store(),
    );

    let records = client.sync().await.expect("sync");
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].sync_committee.as_ref(),
        honest.committee(15)
    );
    // 16 leaves at fanout 4: depth 2
    assert_eq!(a.node_calls(), 2);
    assert_eq!(b.node_calls(), 2);
}

#[tokio::test]
async fn max_provers_caps_the_consulted_pool() {
    init_tracing();
    let fixture = ChainFixture::generate(4, 4, 0x6E);
    let first = counting(MockProver::new(&fixture, 2));
    let second = counting(MockProver::new(&fixture, 2));

    let config = ClientConfig {
        fanout: Some(2),
        max_provers: Some(1),
    };
    let client = SuperlightClient::new(
        config,
        vec![first.clone() as Arc<dyn Prover>, second.clone()],
        fixture.store(),
    );

    let records = client.sync().await.expect("sync");
    assert_eq!(records.len(), 1);
    assert_eq!(second.info_calls(), 0);
}
