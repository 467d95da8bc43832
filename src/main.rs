use jenga_ngin::{config::SceneConfig, flow, scene::JengaScene};

fn main() -> anyhow::Result<()> {
    flow::run(SceneConfig::default(), vec![JengaScene::constructor()])
}
