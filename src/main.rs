//! Synrev - 合成评审团系统
//!
//! 入口：初始化日志与配置，跑一轮完整的评审团演示
//! （未配置 API Key 时自动使用 Mock LLM，离线可运行）。

use std::collections::HashMap;

use anyhow::Context;
use synrev::config::load_config;
use synrev::engine::ReviewEngine;
use synrev::ingest;
use synrev::llm::create_llm_from_config;
use synrev::model::{Panelist, PersonalityScores, UserFeedback};
use synrev::panel::PanelOrchestrator;
use synrev::store::create_store_from_config;
use synrev::training::TrainingAnalyzer;

const DEMO_PROPOSAL: &str = "Adaptive Batching for Federated Gradient Aggregation\n\n\
    Abstract: We propose an adaptive batching scheme for federated learning that sizes \
    aggregation windows by observed client latency variance, reducing stragglers' impact \
    without discarding their updates. We outline a prototype on two hundred simulated \
    clients and a convergence analysis under non-iid data.\n\n\
    Introduction\n\
    Federated aggregation today either waits for stragglers or drops them. Both choices \
    cost either wall-clock time or model quality. We explore a middle path: batching \
    windows that adapt per round to the measured latency distribution, with a fallback \
    to synchronous aggregation when variance collapses.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    synrev::observability::init();

    let cfg = load_config(None).unwrap_or_default();
    let llm = create_llm_from_config(&cfg);
    let store = create_store_from_config(&cfg).context("Failed to create store")?;

    println!("🧪 Synrev panel review demo");

    // 三位人格各异的评审人
    let panelists = vec![
        Panelist::new("Dr. Harsh Stone")
            .with_expertise(vec!["Distributed Systems".into(), "Optimization".into()])
            .with_personality(PersonalityScores::new(9.0, 3.0, 8.0)?),
        Panelist::new("Dr. Amara Bright")
            .with_expertise(vec!["Federated Learning".into(), "Privacy".into()])
            .with_personality(PersonalityScores::new(2.5, 8.5, 4.0)?),
        Panelist::new("Dr. Wei Lin")
            .with_expertise(vec!["Machine Learning".into(), "Statistics".into()]),
    ];
    for p in &panelists {
        store.save_panelist(p).context("Failed to save panelist")?;
    }
    let names: HashMap<_, _> = panelists.iter().map(|p| (p.id, p.name.clone())).collect();

    // 摄取演示提案
    let parsed = ingest::parse(DEMO_PROPOSAL.as_bytes(), "text/plain")
        .context("Failed to parse demo proposal")?;
    let proposal = parsed.into_proposal();
    store.save_proposal(&proposal).context("Failed to save proposal")?;
    println!("📄 Proposal: {}", proposal.title);

    // 评审团生成
    let engine = ReviewEngine::new(llm)
        .with_temperature(cfg.llm.temperature)
        .with_max_output_tokens(cfg.llm.max_output_tokens);
    let orchestrator = PanelOrchestrator::new(engine, store.clone()).with_fan_out(cfg.panel.fan_out);

    let outcome = orchestrator.generate_panel(&proposal, None).await?;
    for review in &outcome.reviews {
        let name = names
            .get(&review.panelist_id)
            .map(String::as_str)
            .unwrap_or("unknown");
        println!(
            "✅ {}: {:.1}/10 ({}), {} trace steps, {} repairs",
            name,
            review.overall_score,
            review.recommendation.as_str(),
            review.trace.len(),
            review.repair_notes.len()
        );
    }
    for failure in &outcome.failures {
        println!("❌ panelist {}: {}", failure.panelist_id, failure.error);
    }

    if let Some(summary) = orchestrator.summarize_proposal(proposal.id)? {
        println!(
            "📊 Panel summary: {} reviews, average {:.2}",
            summary.review_count, summary.average_overall
        );
        for (category, average) in &summary.category_averages {
            println!("   {}: {:.2}", category, average);
        }
    }

    // 给第一条评审附加用户反馈，演示训练统计
    if let Some(first) = outcome.reviews.first() {
        store.attach_feedback(first.id, UserFeedback::new(4, Some("Useful review".into()))?)?;
        let analyzer = TrainingAnalyzer::new(store);
        for suggestion in analyzer.suggestions()? {
            println!("💡 {}", suggestion);
        }
    }

    Ok(())
}
