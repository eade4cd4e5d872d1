//! Driving a whole database through the decoder: per-record conversion,
//! the sequential and sharded-parallel drivers, and the error summary.
//!
//! Per-game errors never halt a batch. A record that cannot become a
//! game is either silently skipped (non-game and deleted records are a
//! normal part of the header file) or recorded with its index, the
//! first byte of its game record, and the reason. Either way the run
//! carries on with the next record.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use log::{info, warn};

use crate::db::{Database, games, player, tournament};
use crate::db::header::{format_date, format_round};
use crate::decode::moves;
use crate::decode::startpos::{self, SETUP_BYTES};
use crate::model::mailbox::Position;
use crate::notation::pgn::{GameTags, write_game};

/// One skipped or failed record, reported in the final summary.
#[derive(Debug, Clone)]
pub struct RecordError {
    pub index: usize,
    pub first_byte: u8,
    pub reason: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, 0x{:02x}, {})", self.index, self.first_byte, self.reason)
    }
}

/// What became of one header record.
pub enum RecordOutcome {
    /// A fully decoded game, rendered as PGN text.
    Game(String),
    /// A non-game or deleted record; normal, not reported.
    Skipped,
    /// A flagged or undecodable game; reported, never half-written.
    Failed(RecordError),
}

#[derive(Debug, Default)]
pub struct ChunkStats {
    pub games: usize,
    pub skipped: usize,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub games: usize,
    pub skipped: usize,
    pub errors: Vec<RecordError>,
}

/// Convert one header record into PGN text.
pub fn convert_record(db: &Database, index: usize) -> RecordOutcome {
    let fail = |first_byte: u8, reason: String| {
        RecordOutcome::Failed(RecordError { index, first_byte, reason })
    };

    let hdr = match db.header(index) {
        Ok(h) => h,
        Err(e) => return fail(0, e.to_string()),
    };
    if !hdr.is_game() || hdr.is_deleted() {
        return RecordOutcome::Skipped;
    }

    let off = hdr.game_offset();
    let Some(pro) = games::prologue_at(&db.cbg, off) else {
        return fail(
            db.cbg.get(off).copied().unwrap_or(0),
            "game record out of bounds".to_string(),
        );
    };
    let first = db.cbg[off];

    if pro.special_encoding {
        return fail(first, "ignored: special encoding flag".to_string());
    }
    if pro.is_960 && pro.not_initial {
        return fail(first, "ignored: 960 with custom start".to_string());
    }
    if pro.is_960 {
        return fail(first, "ignored: chess960 game".to_string());
    }
    if pro.not_encoded {
        return fail(first, "ignored: not encoded".to_string());
    }

    let body = games::record_body(&db.cbg, off, pro);
    let (start, fen, stream) = if pro.not_initial {
        if body.len() < SETUP_BYTES {
            return fail(first, "truncated start position block".to_string());
        }
        match startpos::decode_start_position(&body[..SETUP_BYTES]) {
            Ok((pos, fen)) => (pos, Some(fen), &body[SETUP_BYTES..]),
            Err(e) => return fail(first, e.to_string()),
        }
    } else {
        (Position::startpos(), None, body)
    };

    let game = moves::decode(stream, start, fen);
    if let Some(err) = game.error {
        return fail(first, err.to_string());
    }

    let tourn = tournament::tournament(&db.cbt, hdr.tournament_offset());
    let (round, subround) = hdr.round_subround();
    let (white_elo, black_elo) = hdr.ratings();
    let tags = GameTags {
        event: tourn.title,
        site: tourn.place,
        date: format_date(hdr.yymmdd()),
        round: format_round(round, subround),
        white: player::name(&db.cbp, hdr.white_offset()),
        black: player::name(&db.cbp, hdr.black_offset()),
        result: hdr.result().to_string(),
        white_elo,
        black_elo,
    };

    RecordOutcome::Game(write_game(&tags, &game))
}

/// Convert a contiguous record range, writing games in record order.
pub fn convert_range(
    db: &Database,
    range: Range<usize>,
    out: &mut impl Write,
) -> io::Result<ChunkStats> {
    let mut stats = ChunkStats::default();
    for index in range {
        match convert_record(db, index) {
            RecordOutcome::Game(text) => {
                out.write_all(text.as_bytes())?;
                stats.games += 1;
            }
            RecordOutcome::Skipped => stats.skipped += 1,
            RecordOutcome::Failed(err) => stats.errors.push(err),
        }
    }
    Ok(stats)
}

fn identify_magic(db: &Database) {
    match db.magic() {
        Some(magic) => {
            let hex: String = magic.iter().map(|b| format!("{:02x}", b)).collect();
            info!("header id: {}", hex);
            match hex.as_str() {
                "00002c002e01" => info!("created by CB9+?!"),
                "000024002e01" => info!("created by Chess Program X/CB Light?!"),
                _ => warn!("unrecognized header magic {}", hex),
            }
        }
        None => warn!("header file too short for a file header"),
    }
}

fn report(summary: &Summary, elapsed: std::time::Duration) {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { summary.games as f64 / secs } else { 0.0 };
    info!(
        "done: {} games in {:.1}s ({:.0} games/sec), {} records skipped",
        summary.games, secs, rate, summary.skipped
    );
    info!("errors logged: {}", summary.errors.len());
    for err in &summary.errors {
        warn!("  {}", err);
    }
}

/// Single-threaded conversion, record 1 to the end.
pub fn run_sequential(base: &Path, out_path: &Path) -> anyhow::Result<Summary> {
    let t0 = Instant::now();
    let db = Database::open(base)?;
    identify_magic(&db);

    let mut out = BufWriter::new(
        File::create(out_path).with_context(|| format!("creating {}", out_path.display()))?,
    );
    let records = db.record_count();
    info!("records......: {}", records.saturating_sub(1));
    let stats = convert_range(&db, 1.min(records)..records, &mut out)?;
    out.flush()?;

    let summary = Summary {
        games: stats.games,
        skipped: stats.skipped,
        errors: stats.errors,
    };
    report(&summary, t0.elapsed());
    Ok(summary)
}

/// Parallel conversion: contiguous record chunks, one worker and one
/// shard file per chunk, concatenated in chunk order at the end so the
/// output matches the sequential byte for byte.
pub fn run_parallel(base: &Path, out_path: &Path, workers: usize) -> anyhow::Result<Summary> {
    let t0 = Instant::now();
    let records = {
        let db = Database::open(base)?;
        identify_magic(&db);
        db.record_count()
    };

    let workers = workers.max(1);
    let per_chunk = ((records.saturating_sub(1)) / workers).max(1);
    let mut chunks: Vec<(usize, Range<usize>)> = vec![];
    for id in 0..workers {
        let start = 1 + id * per_chunk;
        let end = if id == workers - 1 {
            records
        } else {
            1 + (id + 1) * per_chunk
        };
        if start < records {
            chunks.push((id, start..end));
        }
    }
    info!(
        "split {} records into {} chunks of ~{} each",
        records.saturating_sub(1),
        chunks.len(),
        per_chunk
    );

    let tmp = tempfile::tempdir().context("creating shard directory")?;
    let tmp_path = tmp.path();

    let results: Vec<(ChunkStats, PathBuf)> = std::thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .iter()
            .map(|(id, range)| {
                let (id, range) = (*id, range.clone());
                scope.spawn(move || -> anyhow::Result<(ChunkStats, PathBuf)> {
                    let db = Database::open(base)?;
                    let path = tmp_path.join(format!("chunk_{:04}.pgn", id));
                    let mut out = BufWriter::new(File::create(&path)?);
                    let stats = convert_range(&db, range, &mut out)?;
                    out.flush()?;
                    info!(
                        "chunk {} done: {} games, {} errors",
                        id,
                        stats.games,
                        stats.errors.len()
                    );
                    Ok((stats, path))
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(res) => res,
                Err(_) => Err(anyhow::anyhow!("conversion worker panicked")),
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let mut out = BufWriter::new(
        File::create(out_path).with_context(|| format!("creating {}", out_path.display()))?,
    );
    let mut summary = Summary::default();
    for (stats, shard) in results {
        summary.games += stats.games;
        summary.skipped += stats.skipped;
        summary.errors.extend(stats.errors);
        io::copy(&mut File::open(&shard)?, &mut out)
            .with_context(|| format!("concatenating {}", shard.display()))?;
    }
    out.flush()?;
    drop(tmp);

    report(&summary, t0.elapsed());
    Ok(summary)
}

#[cfg(test)]
mod fixture {
    use super::*;
    use crate::db::games::GamePrologue;
    use crate::db::header::enc::Record;
    use crate::db::{player, tournament};

    /// Flags on one staged game record.
    #[derive(Default, Clone, Copy)]
    pub struct Flags {
        pub not_initial: bool,
        pub not_encoded: bool,
        pub is_960: bool,
        pub special_encoding: bool,
    }

    pub struct DbBuilder {
        cbh: Vec<u8>,
        cbg: Vec<u8>,
        pub players: Vec<(&'static str, &'static str)>,
        pub tournaments: Vec<(&'static str, &'static str)>,
    }

    impl DbBuilder {
        pub fn new() -> Self {
            let mut cbh = vec![0u8; crate::db::header::CBH_RECORD_SIZE];
            cbh[..6].copy_from_slice(&[0x00, 0x00, 0x2c, 0x00, 0x2e, 0x01]);
            Self {
                cbh,
                cbg: vec![],
                players: vec![],
                tournaments: vec![],
            }
        }

        /// Stage one game: a header record plus its move-stream record.
        pub fn add_game(
            &mut self,
            mut rec: Record,
            flags: Flags,
            setup: Option<[u8; SETUP_BYTES]>,
            payload: &[u8],
        ) {
            let offset = self.cbg.len();
            let mut body = setup.map(|s| s.to_vec()).unwrap_or_default();
            body.extend(payload);

            let pro = GamePrologue {
                not_initial: flags.not_initial || setup.is_some(),
                not_encoded: flags.not_encoded,
                is_960: flags.is_960,
                special_encoding: flags.special_encoding,
                len: games::PROLOGUE_BYTES + body.len(),
            };
            self.cbg.extend(pro.word());
            self.cbg.extend(body);

            rec.game_offset = offset as u32;
            self.cbh.extend(rec.bytes());
        }

        /// Stage a raw header record with no game body behind it.
        pub fn add_record(&mut self, rec: Record) {
            self.cbh.extend(rec.bytes());
        }

        pub fn write(&self, dir: &Path) -> PathBuf {
            let base = dir.join("testdb");
            std::fs::write(base.with_extension("cbh"), &self.cbh).unwrap();
            std::fs::write(base.with_extension("cbg"), &self.cbg).unwrap();
            std::fs::write(base.with_extension("cbp"), player::build_file(&self.players)).unwrap();
            std::fs::write(
                base.with_extension("cbt"),
                tournament::build_file(&self.tournaments),
            )
            .unwrap();
            base
        }
    }
}

#[cfg(test)]
use crate::decode::opcodes::{CASTLE_KINGSIDE, END_OF_GAME, enc};
#[cfg(test)]
use crate::db::header::enc::Record;
#[cfg(test)]
use fixture::{DbBuilder, Flags};

#[cfg(test)]
fn four_ply() -> Vec<u8> {
    vec![
        enc::pawn(4, 0, 2),
        enc::pawn(4, 0, 2),
        enc::knight(1, -1, 2),
        enc::knight(0, -1, 2),
        END_OF_GAME,
    ]
}

#[test]
fn sequential_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = DbBuilder::new();
    builder.players = vec![("Kasparov", "Garry"), ("Anand", "Viswanathan")];
    builder.tournaments = vec![("Linares", "Linares ESP")];
    builder.add_game(
        Record {
            white_offset: 0,
            black_offset: 1,
            tournament_offset: 0,
            date: (1997, 5, 11),
            result: 2,
            round: 6,
            subround: 0,
            white_elo: 2785,
            black_elo: 2765,
            ..Record::default()
        },
        Flags::default(),
        None,
        &four_ply(),
    );
    let base = builder.write(dir.path());
    let out = dir.path().join("out.pgn");

    let summary = run_sequential(&base, &out).unwrap();
    assert_eq!(summary.games, 1);
    assert!(summary.errors.is_empty());

    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        text,
        "[Event \"Linares\"]\n\
         [Site \"Linares ESP\"]\n\
         [Date \"1997.05.11\"]\n\
         [Round \"6\"]\n\
         [White \"Kasparov, Garry\"]\n\
         [Black \"Anand, Viswanathan\"]\n\
         [Result \"1-0\"]\n\
         [WhiteElo \"2785\"]\n\
         [BlackElo \"2765\"]\n\
         \n\
         1. e4 e5 2. Nf3 Nc6 1-0\n\n"
    );
}

#[test]
fn custom_start_castles_with_fen_header() {
    use crate::decode::startpos::enc::Setup;
    use crate::model::{ChessMan, Square};

    let mut setup = Setup::new(vec![
        (Square::e1, ChessMan::WHITE_KING),
        (Square::h1, ChessMan::WHITE_ROOK),
        (Square::e8, ChessMan::BLACK_KING),
    ]);
    setup.rights[0][0] = true;

    let dir = tempfile::tempdir().unwrap();
    let mut builder = DbBuilder::new();
    builder.add_game(
        Record::default(),
        Flags::default(),
        Some(setup.block()),
        &[CASTLE_KINGSIDE, END_OF_GAME],
    );
    let base = builder.write(dir.path());
    let out = dir.path().join("out.pgn");

    let summary = run_sequential(&base, &out).unwrap();
    assert_eq!(summary.games, 1);

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("[SetUp \"1\"]"));
    assert!(text.contains("[FEN \"4k3/8/8/8/8/8/8/4K2R w K - 0 1\"]"));
    assert!(text.contains("1. O-O *"), "got: {}", text);
}

#[test]
fn desynced_game_is_skipped_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = DbBuilder::new();
    // a rook opcode against a bare-kings start references a slot that
    // was never filled
    let setup = crate::decode::startpos::enc::Setup::new(vec![
        (crate::model::Square::e1, crate::model::ChessMan::WHITE_KING),
        (crate::model::Square::e8, crate::model::ChessMan::BLACK_KING),
    ]);
    builder.add_game(
        Record::default(),
        Flags::default(),
        Some(setup.block()),
        &[enc::rook(1, 1, 0), END_OF_GAME],
    );
    builder.add_game(Record::default(), Flags::default(), None, &four_ply());
    let base = builder.write(dir.path());
    let out = dir.path().join("out.pgn");

    let summary = run_sequential(&base, &out).unwrap();
    assert_eq!(summary.games, 1, "the later game still converts");
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].index, 1);
    assert_eq!(summary.errors[0].reason, "rook 1 not in catalog");

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(!text.contains("[SetUp"), "partial game is not written");
    assert!(text.contains("1. e4 e5"));
}

#[test]
fn flagged_and_deleted_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = DbBuilder::new();
    builder.add_game(
        Record::default(),
        Flags { is_960: true, ..Flags::default() },
        None,
        &four_ply(),
    );
    builder.add_game(
        Record::default(),
        Flags { not_encoded: true, ..Flags::default() },
        None,
        &four_ply(),
    );
    builder.add_game(
        Record::default(),
        Flags { special_encoding: true, ..Flags::default() },
        None,
        &four_ply(),
    );
    builder.add_game(
        Record { flags: 0x03, ..Record::default() }, // deleted game
        Flags::default(),
        None,
        &four_ply(),
    );
    builder.add_record(Record { flags: 0x00, ..Record::default() }); // not a game
    let base = builder.write(dir.path());
    let out = dir.path().join("out.pgn");

    let summary = run_sequential(&base, &out).unwrap();
    assert_eq!(summary.games, 0);
    assert_eq!(summary.skipped, 2);
    let reasons: Vec<_> = summary.errors.iter().map(|e| e.reason.as_str()).collect();
    assert_eq!(
        reasons,
        vec![
            "ignored: chess960 game",
            "ignored: not encoded",
            "ignored: special encoding flag",
        ]
    );
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
}

#[test]
fn chess960_with_custom_start_has_its_own_reason() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = DbBuilder::new();
    let setup = crate::decode::startpos::enc::Setup::new(vec![
        (crate::model::Square::e1, crate::model::ChessMan::WHITE_KING),
        (crate::model::Square::e8, crate::model::ChessMan::BLACK_KING),
    ]);
    builder.add_game(
        Record::default(),
        Flags { is_960: true, ..Flags::default() },
        Some(setup.block()),
        &[END_OF_GAME],
    );
    let base = builder.write(dir.path());

    let summary = run_sequential(&base, &dir.path().join("out.pgn")).unwrap();
    assert_eq!(summary.errors[0].reason, "ignored: 960 with custom start");
}

#[test]
fn parallel_output_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = DbBuilder::new();
    builder.players = vec![("Polgar", "Judit"), ("Short", "Nigel")];
    builder.tournaments = vec![("Open", "Budapest HUN")];
    for i in 0..7u8 {
        builder.add_game(
            Record {
                white_offset: (i % 2) as u32,
                black_offset: ((i + 1) % 2) as u32,
                date: (1993, 1 + i, 3),
                result: i % 4,
                round: i + 1,
                subround: i % 2,
                ..Record::default()
            },
            Flags::default(),
            None,
            &four_ply(),
        );
    }
    // one failing game in the middle keeps the shard boundaries honest
    builder.add_game(
        Record::default(),
        Flags { special_encoding: true, ..Flags::default() },
        None,
        &four_ply(),
    );
    let base = builder.write(dir.path());

    let seq_out = dir.path().join("seq.pgn");
    let par_out = dir.path().join("par.pgn");
    let seq = run_sequential(&base, &seq_out).unwrap();
    let par = run_parallel(&base, &par_out, 3).unwrap();

    assert_eq!(seq.games, 7);
    assert_eq!(par.games, 7);
    assert_eq!(par.errors.len(), 1);
    assert_eq!(
        std::fs::read(&seq_out).unwrap(),
        std::fs::read(&par_out).unwrap(),
        "concatenated shards equal the sequential output"
    );

    // re-running is byte-identical
    let again = dir.path().join("seq2.pgn");
    run_sequential(&base, &again).unwrap();
    assert_eq!(
        std::fs::read(&seq_out).unwrap(),
        std::fs::read(&again).unwrap()
    );
}
