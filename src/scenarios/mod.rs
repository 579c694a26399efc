pub mod slack_prune;
