use aipex_snapshot::diff::{diff_snapshots, DiffEntry};
use aipex_snapshot::dom::{CollectorOptions, Node, Snapshot};
use aipex_snapshot::search::{search_and_format, search_snapshot_text, SearchOptions};
use aipex_snapshot::{
    build_text, collect, collect_with_defaults, naming, serialize, Document, NODE_ID_ATTR,
};

// ── Test Fixtures ───────────────────────────────────────────────────────────

const LOGIN: &str = include_str!("fixtures/login.html");
const DASHBOARD: &str = include_str!("fixtures/dashboard.html");

const LOGIN_URL: &str = "https://console.acme.example/login";
const DASHBOARD_URL: &str = "https://console.acme.example/dashboard";

fn snap(html: &str, url: &str) -> (Document, Snapshot) {
    let mut doc = Document::parse(html, url);
    let snapshot = collect_with_defaults(&mut doc);
    (doc, snapshot)
}

fn render(snapshot: &Snapshot) -> String {
    serialize::format(&build_text(snapshot, None))
}

fn snap_text(html: &str, url: &str) -> String {
    let (_, snapshot) = snap(html, url);
    render(&snapshot)
}

fn find_role<'a>(node: &'a Node, role: &str) -> Option<&'a Node> {
    if node.role == role {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_role(child, role))
}

fn find<'a>(node: &'a Node, pred: &dyn Fn(&Node) -> bool) -> Option<&'a Node> {
    if pred(node) {
        return Some(node);
    }
    node.children.iter().find_map(|child| find(child, pred))
}

fn count_nodes(node: &Node) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}

/// Marker character and emitted depth of one rendered line.
fn marker_and_depth(line: &str) -> (char, usize) {
    let spaces = line.chars().take_while(|&c| c == ' ').count();
    match line.chars().nth(spaces) {
        Some(marker @ ('*' | '→')) => (marker, spaces / 2),
        _ => (' ', spaces.saturating_sub(1) / 2),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// END-TO-END SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn hidden_subtree_pruning() {
    let text = snap_text(
        r#"<body>
            <button>Visible button</button>
            <div aria-hidden="true"><span>Hidden text</span><button>Hidden button</button></div>
        </body>"#,
        LOGIN_URL,
    );
    assert!(text.contains("Visible button"));
    assert!(!text.contains("Hidden text"));
    assert!(!text.contains("Hidden button"));
}

#[test]
fn visibility_override_across_levels() {
    let html = r#"<body><div style="visibility: visible">
        <button>Visible L1</button>
        <div style="visibility: hidden">
            <button>Hidden L2</button>
            <div style="visibility: visible">
                <button>Visible L3</button>
                <div style="visibility: hidden">
                    <button>Hidden L4</button>
                    <div style="visibility: visible">
                        <button>Visible L5</button>
                    </div>
                </div>
            </div>
        </div>
    </div></body>"#;
    let (doc, snapshot) = snap(html, LOGIN_URL);
    let text = render(&snapshot);

    for kept in ["Visible L1", "Visible L3", "Visible L5"] {
        assert!(text.contains(kept), "{kept} missing:\n{text}");
    }
    for pruned in ["Hidden L2", "Hidden L4"] {
        assert!(!text.contains(pruned), "{pruned} leaked:\n{text}");
    }

    // Each visible button's live element carries the persisted id.
    for button in doc
        .elements()
        .into_iter()
        .filter(|&id| doc.tag(id) == Some("button"))
        .filter(|&id| naming::visible_text(&doc, id).starts_with("Visible"))
    {
        assert!(
            doc.attr(button, NODE_ID_ATTR).is_some(),
            "visible button missing {NODE_ID_ATTR}"
        );
    }
}

#[test]
fn select_element_value_and_name() {
    let (_, snapshot) = snap(
        r#"<body><select>
            <option value="1">First</option>
            <option value="2" selected>Second</option>
        </select></body>"#,
        LOGIN_URL,
    );
    let combo = find_role(&snapshot.root, "combobox").unwrap();
    assert_eq!(combo.value.as_deref(), Some("2"));
    assert_eq!(combo.name.as_deref(), Some("Second"));

    let text = render(&snapshot);
    assert!(text.contains("<select> value=\"2\""), "text:\n{text}");
    assert!(text.contains("\"Second\""), "text:\n{text}");
}

#[test]
fn focus_marking() {
    let mut doc = Document::parse(
        "<body><button>First</button><button>Second</button></body>",
        LOGIN_URL,
    );
    let second = doc
        .elements()
        .into_iter()
        .filter(|&id| doc.tag(id) == Some("button"))
        .nth(1)
        .unwrap();
    doc.focus(second);
    let snapshot = collect_with_defaults(&mut doc);
    let text = render(&snapshot);

    let root_line = text.lines().next().unwrap();
    assert_eq!(marker_and_depth(root_line), ('→', 0), "root: {root_line:?}");
    let first_line = text.lines().find(|l| l.contains("\"First\"")).unwrap();
    assert_eq!(marker_and_depth(first_line), (' ', 1), "first: {first_line:?}");
    let second_line = text.lines().find(|l| l.contains("\"Second\"")).unwrap();
    assert_eq!(marker_and_depth(second_line), ('*', 1), "second: {second_line:?}");
}

#[test]
fn search_with_alternation_and_context() {
    let text = "\
→uid=root RootWebArea \"Test Page\" <body>\n\
 uid=btn1 button \"Submit Form\" <button>\n\
 uid=btn2 button \"Cancel\" <button>\n\
 uid=input1 textbox \"Email\" <input> desc=\"Enter your email\"\n";

    let result = search_snapshot_text(text, "Submit | Cancel", &SearchOptions::default());
    assert_eq!(result.total_matches, 2);
    assert!(result.matched_lines[0].text.contains("btn1"));
    assert!(result.matched_lines[1].text.contains("btn2"));

    let with_context = search_snapshot_text(
        text,
        "Submit | Cancel",
        &SearchOptions {
            context_levels: 1,
            ..Default::default()
        },
    );
    let indices: Vec<usize> = with_context.context_lines.iter().map(|l| l.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(with_context.context_lines[0].text.contains("RootWebArea"));
    assert!(with_context.context_lines[3].text.contains("Email"));
}

#[test]
fn pointer_card_is_retained_and_searchable() {
    let html = r#"<body><div class="cursor-pointer" style="cursor: pointer">
        <span>Order #A-1042</span>
        <span>Arriving tomorrow</span>
    </div></body>"#;
    let mut doc = Document::parse(html, LOGIN_URL);
    let snapshot = collect_with_defaults(&mut doc);

    let card = doc
        .elements()
        .into_iter()
        .find(|&id| doc.tag(id) == Some("div"))
        .unwrap();
    assert!(doc.attr(card, NODE_ID_ATTR).is_some());
    let card_node = find(&snapshot.root, &|n| n.tag_name.as_deref() == Some("div")).unwrap();
    assert_eq!(card_node.children.len(), 2);

    let output = search_and_format(
        Some(&snapshot),
        "Arriving tomorrow",
        0,
        &SearchOptions::default(),
    )
    .unwrap();
    assert!(output.contains("Arriving tomorrow"), "output: {output}");
    assert!(output.contains("✓ "), "output: {output}");
}

// ═══════════════════════════════════════════════════════════════════════════
// ID STABILITY
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn ids_stable_across_four_collections_with_varying_options() {
    let mut doc = Document::parse(LOGIN, LOGIN_URL);
    let passes = [
        CollectorOptions::default(),
        CollectorOptions {
            max_text_length: 40,
            ..Default::default()
        },
        CollectorOptions {
            include_hidden: true,
            ..Default::default()
        },
        CollectorOptions::default(),
    ];

    let mut seen: Vec<Option<String>> = vec![None; doc.elements().len()];
    let mut root_id = None;
    for options in passes {
        let snapshot = collect(&mut doc, options);
        match &root_id {
            None => root_id = Some(snapshot.root.id.clone()),
            Some(expected) => assert_eq!(&snapshot.root.id, expected),
        }
        for (index, element) in doc.elements().into_iter().enumerate() {
            let current = doc.attr(element, NODE_ID_ATTR).map(str::to_string);
            if let Some(previous) = &seen[index] {
                assert_eq!(
                    current.as_ref(),
                    Some(previous),
                    "assigned id must never change"
                );
            } else {
                seen[index] = current;
            }
        }
    }
}

#[test]
fn pre_existing_opaque_ids_are_honored() {
    let html = r#"<body><button data-aipex-nodeid="existing_id">Go on</button></body>"#;
    let (doc, snapshot) = snap(html, LOGIN_URL);
    assert!(snapshot.contains("existing_id"));
    let button = doc
        .elements()
        .into_iter()
        .find(|&id| doc.tag(id) == Some("button"))
        .unwrap();
    assert_eq!(doc.attr(button, NODE_ID_ATTR), Some("existing_id"));
}

#[test]
fn written_attributes_match_the_id_contract() {
    let (doc, _) = snap(LOGIN, LOGIN_URL);
    for element in doc.elements() {
        if let Some(value) = doc.attr(element, NODE_ID_ATTR) {
            let rest = value.strip_prefix("dom_").unwrap_or_else(|| {
                panic!("unexpected id shape: {value}");
            });
            assert!(rest.len() >= 10, "id too short: {value}");
            assert!(
                rest.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
                "id not base36: {value}"
            );
        }
    }
}

#[test]
fn snapshot_ids_are_unique() {
    let (doc, snapshot) = snap(DASHBOARD, DASHBOARD_URL);
    assert_eq!(count_nodes(&snapshot.root), snapshot.id_to_node.len());
    assert_eq!(snapshot.total_nodes, snapshot.id_to_node.len());

    let mut live_ids: Vec<&str> = doc
        .elements()
        .into_iter()
        .filter_map(|id| doc.attr(id, NODE_ID_ATTR))
        .collect();
    let before = live_ids.len();
    live_ids.sort_unstable();
    live_ids.dedup();
    assert_eq!(live_ids.len(), before, "duplicate live ids");
}

#[test]
fn root_contract() {
    let (doc, snapshot) = snap(LOGIN, LOGIN_URL);
    assert_eq!(snapshot.root.role, "RootWebArea");
    assert!(snapshot.contains(&snapshot.root.id));
    let body = doc.body().unwrap();
    assert_eq!(doc.attr(body, NODE_ID_ATTR), Some(snapshot.root.id.as_str()));
    assert_eq!(snapshot.metadata.title, "Acme Console - Sign in");
}

// ═══════════════════════════════════════════════════════════════════════════
// FIXTURE PAGES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn login_page_excludes_non_content_and_hidden_text() {
    let text = snap_text(LOGIN, LOGIN_URL);
    for leaked in [
        "analytics",
        "__BOOT_STATE__",
        "csrfToken",
        "keyframes",
        "sr-only",
        "viewBox",
        "enable JavaScript",
        "Decorative banner",
        "Invalid credentials",
        "Session expired",
    ] {
        assert!(!text.contains(leaked), "{leaked} leaked into:\n{text}");
    }
}

#[test]
fn login_page_keeps_interactive_surface() {
    let text = snap_text(LOGIN, LOGIN_URL);
    assert!(text.contains("RootWebArea \"Acme Console - Sign in\""));
    assert!(text.contains("\"Work email\""));
    assert!(text.contains("value=\"*******\""), "masked password:\n{text}");
    assert!(text.contains("checkbox \"Remember this device\" <input> checked=\"false\""));
    assert!(text.contains("button \"Sign in\" <button>"));
    assert!(text.contains("link \"Forgot password?\" <a>"));
    assert!(text.contains("StaticText \"Sign in to your workspace\""));
}

#[test]
fn dashboard_state_attributes_render() {
    let text = snap_text(DASHBOARD, DASHBOARD_URL);
    assert!(text.contains("button \"Toggle dark mode\" <button> pressed=\"false\""));
    assert!(text.contains("searchbox \"Search devices\""));
    assert!(text.contains("combobox \"Online\" <select> value=\"online\""));
    assert!(text.contains("textbox \"\" <textarea> desc=\"Operator notes\" placeholder=\"Operator notes\""));
    assert!(text.contains("image \"Fleet topology map\" <img> desc=\"Fleet topology map\""));
}

#[test]
fn dashboard_visibility_reassertion() {
    let text = snap_text(DASHBOARD, DASHBOARD_URL);
    assert!(!text.contains("Maintenance tray"));
    assert!(text.contains("Resume rollout"));
}

#[test]
fn same_origin_frame_collected_cross_origin_frame_empty() {
    let (_, snapshot) = snap(DASHBOARD, DASHBOARD_URL);
    let widget_link = find(&snapshot.root, &|n| {
        n.name.as_deref() == Some("Status widget")
    })
    .unwrap();
    assert_eq!(
        widget_link.href.as_deref(),
        Some("https://console.acme.example/status")
    );

    let sponsored = find(&snapshot.root, &|n| {
        n.tag_name.as_deref() == Some("iframe") && n.title.as_deref() == Some("Sponsored")
    })
    .unwrap();
    assert!(sponsored.children.is_empty());
}

#[test]
fn interactive_text_content_rule_holds() {
    let (_, snapshot) = snap(DASHBOARD, DASHBOARD_URL);

    // Pointer-cursor cards are interactive and their text differs from
    // their (absent) name.
    let card = find(&snapshot.root, &|n| {
        n.text_content
            .as_deref()
            .is_some_and(|t| t.contains("edge-gateway-01"))
    })
    .unwrap();
    assert_eq!(card.name, None);

    // StaticText leaves never carry text_content, and named interactive
    // nodes whose text equals their name do not repeat it.
    fn check(node: &Node) {
        if node.role == "StaticText" {
            assert_eq!(node.text_content, None);
        }
        if let (Some(name), Some(text)) = (&node.name, &node.text_content) {
            assert_ne!(name, text, "text_content must differ from name");
        }
        node.children.iter().for_each(check);
    }
    check(&snapshot.root);
}

// ═══════════════════════════════════════════════════════════════════════════
// RENDERED-TEXT PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn focus_ancestor_chain_is_fully_marked() {
    let mut doc = Document::parse(DASHBOARD, DASHBOARD_URL);
    let search_box = doc
        .elements()
        .into_iter()
        .find(|&id| doc.attr(id, "type") == Some("search"))
        .unwrap();
    doc.focus(search_box);
    let snapshot = collect_with_defaults(&mut doc);
    let text = render(&snapshot);

    assert!(text.contains('*'), "focused marker missing:\n{text}");
    let mut ancestors: Vec<char> = Vec::new();
    for line in text.lines() {
        let (marker, depth) = marker_and_depth(line);
        ancestors.truncate(depth);
        if marker == '*' {
            assert_eq!(ancestors.len(), depth, "broken ancestor chain: {line:?}");
            assert!(
                ancestors.iter().all(|&m| m == '→'),
                "unmarked ancestor above {line:?}:\n{text}"
            );
        }
        ancestors.push(marker);
    }
}

#[test]
fn every_rendered_line_is_findable() {
    let text = snap_text(DASHBOARD, DASHBOARD_URL);
    for line in text.lines() {
        let body = line
            .trim_start()
            .trim_start_matches(['*', '→'])
            .trim_start();
        if body.is_empty() || body.contains(['*', '?', '{', '}', '|']) {
            continue;
        }
        let result = search_snapshot_text(&text, body, &SearchOptions::default());
        assert!(result.total_matches >= 1, "no match for line body {body:?}");
        assert!(
            result.matched_lines.iter().any(|m| m.text.contains(body)),
            "matched lines do not include {body:?}"
        );
    }
}

#[test]
fn default_search_is_case_insensitive() {
    let text = snap_text(LOGIN, LOGIN_URL);
    let relaxed = search_snapshot_text(&text, "SIGN IN", &SearchOptions::default());
    let strict = search_snapshot_text(
        &text.to_lowercase(),
        "sign in",
        &SearchOptions {
            case_sensitive: true,
            ..Default::default()
        },
    );
    assert!(relaxed.total_matches > 0);
    assert_eq!(relaxed.total_matches, strict.total_matches);
}

#[test]
fn pipe_query_is_union_of_terms() {
    let text = snap_text(LOGIN, LOGIN_URL);
    let combined = search_snapshot_text(&text, "Pricing | Terms", &SearchOptions::default());
    let mut union: Vec<usize> = search_snapshot_text(&text, "Pricing", &SearchOptions::default())
        .matched_lines
        .iter()
        .chain(
            search_snapshot_text(&text, "Terms", &SearchOptions::default())
                .matched_lines
                .iter(),
        )
        .map(|m| m.index)
        .collect();
    union.sort_unstable();
    union.dedup();
    let combined_indices: Vec<usize> = combined.matched_lines.iter().map(|m| m.index).collect();
    assert_eq!(combined_indices, union);
    assert!(!combined_indices.is_empty());
}

#[test]
fn no_matches_message_contract() {
    let (_, snapshot) = snap(LOGIN, LOGIN_URL);
    let output = search_and_format(
        Some(&snapshot),
        "definitely-not-on-this-page",
        1,
        &SearchOptions::default(),
    )
    .unwrap();
    assert!(output.starts_with("No matches found"));
    assert!(search_and_format(None, "x", 0, &SearchOptions::default()).is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// SNAPSHOT LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn diff_after_interaction_uses_stable_ids() {
    let mut doc = Document::parse(LOGIN, LOGIN_URL);
    let before = collect_with_defaults(&mut doc);
    let checkbox = doc
        .elements()
        .into_iter()
        .find(|&id| doc.attr(id, "type") == Some("checkbox"))
        .unwrap();
    doc.set_attr(checkbox, "checked", "");
    doc.focus(checkbox);
    let after = collect_with_defaults(&mut doc);

    let diff = diff_snapshots(&before, &after);
    assert!(diff.total_changes >= 1);
    assert!(
        diff.entries
            .iter()
            .all(|e| !matches!(e, DiffEntry::Added(_) | DiffEntry::Removed(_))),
        "stable ids must not produce add/remove churn"
    );
}

#[test]
fn snapshot_serializes_with_metadata() {
    let (_, snapshot) = snap(LOGIN, LOGIN_URL);
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["metadata"]["title"], "Acme Console - Sign in");
    assert_eq!(json["metadata"]["url"], LOGIN_URL);
    assert_eq!(json["metadata"]["options"]["max_text_length"], 160);
    assert_eq!(json["root"]["role"], "RootWebArea");
    assert!(json["total_nodes"].as_u64().unwrap() > 0);
}

#[test]
fn capture_from_file_on_disk() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LOGIN.as_bytes()).unwrap();
    let html = std::fs::read_to_string(file.path()).unwrap();
    let (_, snapshot) = snap(&html, LOGIN_URL);
    assert!(render(&snapshot).contains("button \"Sign in\""));
}
