//! Match subcommands: record, edit, verify, list.

use anyhow::Context as _;
use clap::Subcommand;

use dink_sync::SyncContext;
use dink_sync::matches::{self, RecordMatch};
use dink_sync::model::Match;
use dink_sync::remote::HttpRemoteStore;
use dink_sync::verify::match_status;

#[derive(Subcommand, Debug)]
pub enum MatchCmd {
    /// Record a match; the device's active profile is the recorder
    Record {
        /// Team 1 profile ids (1 for singles, 2 for doubles)
        #[arg(long = "team1", num_args = 1..=2, required = true)]
        team1: Vec<String>,
        /// Team 2 profile ids (1 for singles, 2 for doubles)
        #[arg(long = "team2", num_args = 1..=2, required = true)]
        team2: Vec<String>,
        #[arg(long)]
        score_team1: i64,
        #[arg(long)]
        score_team2: i64,
        #[arg(long)]
        venue_id: Option<String>,
    },
    /// Edit a match's provisional score (clears standing verifications)
    Edit {
        match_id: String,
        #[arg(long)]
        score_team1: i64,
        #[arg(long)]
        score_team2: i64,
    },
    /// Verify a match result for the active profile's team
    Verify {
        match_id: String,
        #[arg(long)]
        score_team1: i64,
        #[arg(long)]
        score_team2: i64,
    },
    /// List cached matches with their verification status
    List,
}

pub async fn run(ctx: &SyncContext<HttpRemoteStore>, cmd: MatchCmd) -> anyhow::Result<()> {
    let viewer = ctx
        .links
        .load_link()
        .await
        .map_err(|e| anyhow::anyhow!("link lookup failed: {e}"))?
        .map(|l| l.profile_id);

    match cmd {
        MatchCmd::Record {
            team1,
            team2,
            score_team1,
            score_team2,
            venue_id,
        } => {
            let params = RecordMatch {
                team1_player1: team1.first().cloned(),
                team1_player2: team1.get(1).cloned(),
                team2_player1: team2.first().cloned(),
                team2_player2: team2.get(1).cloned(),
                score_team1,
                score_team2,
                created_by: viewer.clone(),
                venue_id,
            };
            let m = matches::record_match(&ctx.matches, &ctx.profiles, params)
                .await
                .map_err(|e| anyhow::anyhow!("record failed: {e}"))?;
            println!("recorded {}", m.id);
            println!("{}", describe(&m, viewer.as_deref()));
        }
        MatchCmd::Edit {
            match_id,
            score_team1,
            score_team2,
        } => {
            let editor = viewer.clone().context("no profile linked to this device")?;
            let m = matches::update_score(&ctx.matches, &match_id, &editor, score_team1, score_team2)
                .await
                .map_err(|e| anyhow::anyhow!("edit failed: {e}"))?;
            println!("{}", describe(&m, viewer.as_deref()));
        }
        MatchCmd::Verify {
            match_id,
            score_team1,
            score_team2,
        } => {
            let verifier = viewer.clone().context("no profile linked to this device")?;
            let m = matches::record_verification(
                &ctx.matches,
                &match_id,
                &verifier,
                score_team1,
                score_team2,
            )
            .await
            .map_err(|e| anyhow::anyhow!("verify failed: {e}"))?;
            println!("{}", describe(&m, viewer.as_deref()));
        }
        MatchCmd::List => {
            for m in ctx
                .matches
                .list()
                .await
                .map_err(|e| anyhow::anyhow!("list failed: {e}"))?
            {
                println!("{}", describe(&m, viewer.as_deref()));
            }
        }
    }
    Ok(())
}

fn describe(m: &Match, viewer: Option<&str>) -> String {
    let status = match_status(m, viewer);
    let slot = |s: &Option<String>| s.clone().unwrap_or_default();
    let team1 = [slot(&m.team1_player1), slot(&m.team1_player2)]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    let team2 = [slot(&m.team2_player1), slot(&m.team2_player2)]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{}  {team1} vs {team2}  {}-{}  [{}]",
        m.id,
        m.score_team1,
        m.score_team2,
        status.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_includes_score_and_status() {
        let m = Match {
            id: "m-1".to_string(),
            team1_player1: Some("ada".to_string()),
            team2_player1: Some("bea".to_string()),
            score_team1: 11,
            score_team2: 7,
            ..Match::default()
        };
        let line = describe(&m, Some("ada"));
        assert!(line.contains("ada vs bea"));
        assert!(line.contains("11-7"));
        assert!(line.contains('['));
    }
}
