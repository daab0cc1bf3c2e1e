//! Walks one collaboration from proposal to completion: contract signing,
//! escrow funding, content review, milestone releases and withdrawal.
//!
//! Run with `RUST_LOG=info cargo run -p collabpay-demo` to watch every
//! state transition and money movement.

use anyhow::Result;
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::EnvFilter;

use collabpay_engine::CollabEngine;
use collabpay_lifecycle::CreateCollaborationParams;
use collabpay_types::{
    Actor, BrandId, CampaignId, CollabAction, Currency, InfluencerId, MilestoneInput,
    PartyRole, PayoutDestination, ReviewDecision, ReviewInput, SignatureRequest,
    SubmissionInput, UserId, WalletType,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let engine = CollabEngine::new().await;
    let brand = Actor::brand(UserId::new());
    let influencer = Actor::influencer(UserId::new());

    // A brand proposes a 5,000 USD collaboration (10% platform commission)
    let collaboration = engine
        .collaborations()
        .create(CreateCollaborationParams {
            campaign_id: CampaignId::new(),
            brand_id: BrandId::new(),
            influencer_id: InfluencerId::new(),
            agreed_amount: dec!(5000),
            commission_rate: None,
            currency: Currency::Usd,
            start_date: None,
            end_date: None,
            content_due_date: None,
        })
        .await?;
    info!(
        id = %collaboration.id,
        fee = %collaboration.platform_fee,
        payout = %collaboration.influencer_payout,
        "proposal sent"
    );

    // Proposal accepted, contract generated and signed by both parties
    engine
        .collaborations()
        .transition(collaboration.id, influencer, CollabAction::Accept, None)
        .await?;
    engine
        .contracts()
        .generate(collaboration.id, brand, None, None)
        .await?;
    for (actor, role) in [(brand, PartyRole::Brand), (influencer, PartyRole::Influencer)] {
        engine
            .contracts()
            .sign(
                collaboration.id,
                actor.user_id,
                role,
                SignatureRequest {
                    signature: format!("{role} e-signature"),
                    ip_address: None,
                },
            )
            .await?;
    }

    // The brand funds escrow for the full agreed amount
    engine
        .wallets()
        .deposit(
            brand.user_id,
            WalletType::BrandWallet,
            dec!(6000),
            "Campaign budget",
        )
        .await?;
    let escrow = engine
        .setup_escrow(collaboration.id, brand.user_id, influencer.user_id)
        .await?;
    engine.escrow().fund(escrow.id, brand.user_id).await?;

    // Two payment tranches
    let milestones = engine
        .milestones()
        .create_batch(
            collaboration.id,
            vec![
                MilestoneInput {
                    title: "Draft approved".to_string(),
                    amount: dec!(2000),
                },
                MilestoneInput {
                    title: "Content published".to_string(),
                    amount: dec!(3000),
                },
            ],
        )
        .await?;

    // Production and review
    engine
        .collaborations()
        .transition(collaboration.id, influencer, CollabAction::StartProduction, None)
        .await?;
    let deliverable = engine
        .deliverables()
        .create(collaboration.id, "Sponsored reel")
        .await?;
    engine
        .deliverables()
        .submit(
            deliverable.id,
            SubmissionInput {
                media_urls: vec!["https://cdn.example.com/reel-final.mp4".to_string()],
                caption: Some("Final cut".to_string()),
            },
        )
        .await?;
    engine
        .collaborations()
        .transition(collaboration.id, influencer, CollabAction::SubmitContent, None)
        .await?;
    engine
        .deliverables()
        .review(
            deliverable.id,
            brand.user_id,
            ReviewInput {
                decision: ReviewDecision::Approved,
                feedback: Some("Looks great".to_string()),
            },
        )
        .await?;
    engine
        .collaborations()
        .transition(collaboration.id, brand, CollabAction::ApproveContent, None)
        .await?;
    engine
        .collaborations()
        .transition(collaboration.id, influencer, CollabAction::Publish, None)
        .await?;
    engine
        .collaborations()
        .transition(collaboration.id, influencer, CollabAction::RequestPayment, None)
        .await?;

    // Release both milestones and complete
    for milestone in &milestones {
        engine
            .release_milestone(milestone.id, brand, milestone.title.clone())
            .await?;
    }
    let collaboration = engine
        .collaborations()
        .transition(collaboration.id, brand, CollabAction::Complete, None)
        .await?;
    info!(status = %collaboration.status, "collaboration complete");

    // The influencer withdraws to a verified payout method
    let method = engine
        .wallets()
        .add_payout_method(
            influencer.user_id,
            PayoutDestination::Paypal {
                email: "creator@example.com".to_string(),
            },
        )
        .await;
    engine
        .wallets()
        .verify_payout_method(influencer.user_id, method.id)
        .await?;
    let balance = engine.wallets().balance(influencer.user_id).await;
    engine
        .wallets()
        .withdraw(influencer.user_id, balance.available, method.id)
        .await?;
    info!(amount = %balance.available, "influencer paid out");

    Ok(())
}
