pub mod replay_recorder;
