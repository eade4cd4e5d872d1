//! Writing a decoded game as PGN text: the tag pair section, then the
//! movetext with numbering, variations in parentheses, comments in
//! braces, and NAGs as `$n` tokens, wrapped near 80 columns.

use crate::decode::moves::DecodedGame;
use crate::model::ChessColor;
use crate::model::tree::{GameTree, NodeId};

/// The header fields of one game. Unknown text fields use the PGN
/// convention of a single question mark.
#[derive(Debug, Clone)]
pub struct GameTags {
    pub event: String,
    pub site: String,
    pub date: String,
    pub round: String,
    pub white: String,
    pub black: String,
    pub result: String,
    pub white_elo: u16,
    pub black_elo: u16,
}

impl Default for GameTags {
    fn default() -> Self {
        Self {
            event: "?".into(),
            site: "?".into(),
            date: "????.??.??".into(),
            round: "1".into(),
            white: "?".into(),
            black: "?".into(),
            result: "*".into(),
            white_elo: 0,
            black_elo: 0,
        }
    }
}

fn tag(out: &mut String, name: &str, value: &str) {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    out.push_str(&format!("[{} \"{}\"]\n", name, escaped));
}

/// Render one complete game, trailing blank line included.
pub fn write_game(tags: &GameTags, game: &DecodedGame) -> String {
    let mut out = String::new();

    tag(&mut out, "Event", &tags.event);
    tag(&mut out, "Site", &tags.site);
    tag(&mut out, "Date", &tags.date);
    tag(&mut out, "Round", &tags.round);
    tag(&mut out, "White", &tags.white);
    tag(&mut out, "Black", &tags.black);
    tag(&mut out, "Result", &tags.result);
    if tags.white_elo > 0 {
        tag(&mut out, "WhiteElo", &tags.white_elo.to_string());
    }
    if tags.black_elo > 0 {
        tag(&mut out, "BlackElo", &tags.black_elo.to_string());
    }
    if let Some(fen) = &game.fen {
        tag(&mut out, "SetUp", "1");
        tag(&mut out, "FEN", fen);
    }
    out.push('\n');

    let mut tokens = vec![];
    let root = game.tree.node(GameTree::ROOT);
    if let Some(c) = &root.comment {
        tokens.push(brace(c));
    }
    if let Some(&first) = root.children.first() {
        emit_line(
            &game.tree,
            first,
            game.start.turn as u32,
            game.start.to_move,
            &mut tokens,
        );
    }
    tokens.push(tags.result.clone());

    out.push_str(&layout(&tokens));
    out.push_str("\n\n");
    out
}

fn brace(comment: &str) -> String {
    // a closing brace inside the text would end the comment early
    format!("{{{}}}", comment.replace('{', "(").replace('}', ")"))
}

/// Emit one line of play starting at `first`, recursing into the
/// variations hanging off each mainline move.
fn emit_line(
    tree: &GameTree,
    first: NodeId,
    mut turn: u32,
    mut side: ChessColor,
    tokens: &mut Vec<String>,
) {
    let mut node = Some(first);
    let mut need_number = true;

    while let Some(id) = node {
        let n = tree.node(id);

        if side == ChessColor::WHITE {
            tokens.push(format!("{}.", turn));
        } else if need_number {
            tokens.push(format!("{}...", turn));
        }
        need_number = false;
        tokens.push(n.san.clone());

        for nag in &n.nags {
            tokens.push(format!("${}", nag));
        }
        if let Some(c) = &n.comment {
            tokens.push(brace(c));
            need_number = true;
        }

        // alternatives to this move are stored as its later siblings
        if let Some(parent) = n.parent {
            let siblings = &tree.node(parent).children;
            if siblings.first() == Some(&id) {
                for &var in &siblings[1..] {
                    tokens.push("(".into());
                    emit_line(tree, var, turn, side, tokens);
                    tokens.push(")".into());
                    need_number = true;
                }
            }
        }

        if side == ChessColor::BLACK {
            turn += 1;
        }
        side = side.opp();
        node = n.children.first().copied();
    }
}

/// Join tokens with spaces, except around parentheses, wrapping lines
/// before they pass 80 columns.
fn layout(tokens: &[String]) -> String {
    let mut lines = vec![String::new()];

    for tok in tokens {
        let cur = lines.last().unwrap();
        let glue = if cur.is_empty() || cur.ends_with('(') || tok == ")" {
            ""
        } else {
            " "
        };
        if !cur.is_empty() && cur.len() + glue.len() + tok.len() > 79 {
            lines.push(tok.clone());
        } else {
            let cur = lines.last_mut().unwrap();
            cur.push_str(glue);
            cur.push_str(tok);
        }
    }

    lines.join("\n")
}

#[cfg(test)]
use crate::decode::moves::decode;
#[cfg(test)]
use crate::decode::opcodes::{END_OF_GAME, POP_VARIATION, PUSH_VARIATION, enc};
#[cfg(test)]
use crate::model::mailbox::Position;

#[test]
fn four_ply_game_renders_whole() {
    let stream = [
        enc::pawn(4, 0, 2),
        enc::pawn(4, 0, 2),
        enc::knight(1, -1, 2),
        enc::knight(0, -1, 2),
        END_OF_GAME,
    ];
    let game = decode(&stream, Position::startpos(), None);
    let text = write_game(&GameTags::default(), &game);

    assert_eq!(
        text,
        "[Event \"?\"]\n\
         [Site \"?\"]\n\
         [Date \"????.??.??\"]\n\
         [Round \"1\"]\n\
         [White \"?\"]\n\
         [Black \"?\"]\n\
         [Result \"*\"]\n\
         \n\
         1. e4 e5 2. Nf3 Nc6 *\n\n"
    );
}

#[test]
fn variation_with_comment_renders_in_parens() {
    let stream = [
        enc::pawn(4, 0, 2),
        enc::pawn(4, 0, 2),
        PUSH_VARIATION,
        enc::pawn(2, 0, 2),
    ]
    .into_iter()
    .chain(enc::comment("Sicilian"))
    .chain([POP_VARIATION, enc::knight(1, -1, 2), END_OF_GAME])
    .collect::<Vec<_>>();

    let game = decode(&stream, Position::startpos(), None);
    let text = write_game(&GameTags::default(), &game);
    assert!(
        text.contains("1. e4 e5 (1... c5 {Sicilian}) 2. Nf3"),
        "got: {}",
        text
    );
}

#[test]
fn black_to_move_start_numbers_with_ellipsis() {
    use crate::model::{ChessMan, Square};

    let mut pos = Position::empty();
    pos.place(Square::b6, ChessMan::WHITE_KING, 0).unwrap();
    pos.place(Square::d5, ChessMan::BLACK_KING, 0).unwrap();
    pos.to_move = ChessColor::BLACK;
    pos.turn = 60;

    // black king steps toward the pawn side
    let stream = [enc::king(1, 1), END_OF_GAME];
    let fen = crate::notation::fen::fen(&pos);
    let game = decode(&stream, pos, Some(fen.clone()));
    let text = write_game(&GameTags::default(), &game);

    assert!(text.contains("[SetUp \"1\"]"));
    assert!(text.contains(&format!("[FEN \"{}\"]", fen)));
    assert!(text.contains("60... Kc4"), "got: {}", text);
}

#[test]
fn nags_render_as_dollar_tokens() {
    let stream = [enc::pawn(4, 0, 2)]
        .into_iter()
        .chain(enc::annotation([1, 0, 0]))
        .chain([END_OF_GAME])
        .collect::<Vec<_>>();

    let game = decode(&stream, Position::startpos(), None);
    let text = write_game(&GameTags::default(), &game);
    assert!(text.contains("1. e4 $1 *"), "got: {}", text);
}

#[test]
fn long_games_wrap_under_eighty_columns() {
    // shuffle the knights back and forth long enough to overflow a line
    let mut stream = vec![];
    for _ in 0..12 {
        stream.push(enc::knight(1, -1, 2));
        stream.push(enc::knight(0, -1, 2));
        stream.push(enc::knight(1, 1, -2));
        stream.push(enc::knight(0, 1, -2));
    }
    stream.push(END_OF_GAME);

    let game = decode(&stream, Position::startpos(), None);
    let text = write_game(&GameTags::default(), &game);
    let moves = text.split("\n\n").nth(1).unwrap();
    assert!(moves.lines().count() > 1);
    assert!(moves.lines().all(|l| l.len() <= 80));
}
