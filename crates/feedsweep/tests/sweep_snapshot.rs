use std::path::Path;

use anyhow::Result;
use feedsweep::app::remover::Remover;
use feedsweep::infra::config::Config;
use feedsweep::infra::document::NodeId;
use feedsweep::infra::snapshot;

#[test]
fn home_feed_after_sweep() -> Result<()> {
    let page = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/home-feed.yaml");
    let mut doc = snapshot::load_page(&page)?;
    let mut remover: Remover<NodeId> = Remover::from_config(&Config::default())?;

    remover.start(&doc);
    let report = remover.on_paint(&mut doc);
    assert_eq!(report.removed, 3);

    let outline = doc.outline();
    insta::assert_snapshot!("home_feed_after_sweep", outline);
    Ok(())
}
