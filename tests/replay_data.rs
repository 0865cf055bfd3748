//! Replays the bundled sample feed end to end

use std::path::PathBuf;

use avl_orderbook::{PriceLevel, PriceScale, Replayer};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

#[test]
fn test_sample_feed_replay() {
    let mut replayer = Replayer::new("BTCUSDT", PriceScale::default());
    replayer
        .load_snapshot_file(&data_path("snapshot.json"))
        .unwrap();
    let stats = replayer
        .replay_file(&data_path("deltas.ndjson"))
        .unwrap();

    let book = replayer.book();
    assert_eq!(book.best_bid_level(), Some(PriceLevel::new(220_000, 410_000_000)));
    assert_eq!(book.best_ask(), Some(250_000));
    assert_eq!(book.spread(), Some(30_000));
    assert_eq!(book.asks().iter().map(|l| l.price).collect::<Vec<_>>(), vec![250_000, 280_000]);
    assert_eq!(stats.removed, 2);
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.inserted, 2);

    book.bids().validate().unwrap();
    book.asks().validate().unwrap();
}
