use super::{DesktopClient, DesktopUpdate};
use crate::clients::sway::Client;
use crate::desktop::{DesktopSnapshot, WindowSnapshot, WorkspaceSnapshot};
use color_eyre::Result;
use swayipc_async::{Connection, Node, NodeLayout, NodeType};
use tokio::sync::broadcast::Receiver;

/// Sway keeps scratchpad windows on this hidden workspace.
const SCRATCHPAD: &str = "__i3_scratch";

impl DesktopClient for Client {
    fn subscribe(&self) -> Receiver<DesktopUpdate> {
        self.subscribe_desktop()
    }
}

/// Queries the focused workspace and the layout tree.
pub async fn fetch_snapshot(connection: &mut Connection) -> Result<DesktopSnapshot> {
    let active = connection
        .get_workspaces()
        .await?
        .into_iter()
        .find(|workspace| workspace.focused)
        .map(|workspace| workspace.id);

    let tree = connection.get_tree().await?;

    Ok(snapshot_from_tree(&tree, active))
}

pub fn snapshot_from_tree(tree: &Node, active: Option<i64>) -> DesktopSnapshot {
    let mut workspaces = Vec::new();
    collect_workspaces(tree, &mut workspaces);

    DesktopSnapshot { active, workspaces }
}

fn collect_workspaces(node: &Node, workspaces: &mut Vec<WorkspaceSnapshot>) {
    if matches!(node.node_type, NodeType::Workspace) {
        if node.name.as_deref() != Some(SCRATCHPAD) {
            let mut windows = Vec::new();
            collect_windows(node, false, &mut windows);

            workspaces.push(WorkspaceSnapshot {
                id: node.id,
                name: node.name.clone().unwrap_or_default(),
                windows,
            });
        }

        return;
    }

    for child in &node.nodes {
        collect_workspaces(child, workspaces);
    }
}

/// Collects the application windows below `node`, tiled then floating.
///
/// Sway has no minimized state, and its `visible` flag is false for every window
/// on an unfocused workspace. A window is instead treated as minimized
/// when a tabbed or stacked container above it shows a different child.
/// This only depends on the workspace's own layout,
/// so switching workspaces does not change it.
fn collect_windows(node: &Node, hidden: bool, windows: &mut Vec<WindowSnapshot>) {
    let stacked = matches!(node.layout, NodeLayout::Tabbed | NodeLayout::Stacked);
    // the head of the focus stack is the child on top
    let shown = node.focus.first().copied();

    for child in &node.nodes {
        let hidden = hidden || (stacked && shown != Some(child.id));
        visit(child, hidden, windows);
    }

    for child in &node.floating_nodes {
        visit(child, hidden, windows);
    }
}

fn visit(node: &Node, hidden: bool, windows: &mut Vec<WindowSnapshot>) {
    if is_window(node) {
        windows.push(WindowSnapshot {
            id: node.id,
            minimized: hidden,
            skip_taskbar: false,
        });
    } else {
        collect_windows(node, hidden, windows);
    }
}

/// Split containers have no client process.
fn is_window(node: &Node) -> bool {
    matches!(node.node_type, NodeType::Con | NodeType::FloatingCon) && node.pid.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::Background;
    use crate::background::tests::RecordingSink;
    use crate::config::{Config, ConfigStore};
    use crate::desktop::Desktop;
    use crate::tracker::{TrackerOptions, WorkspaceWindowTracker};
    use serde_json::{Value, json};
    use std::rc::Rc;

    fn node(id: i64, node_type: &str) -> Value {
        let rect = json!({ "x": 0, "y": 0, "width": 0, "height": 0 });

        json!({
            "id": id,
            "name": null,
            "type": node_type,
            "border": "none",
            "current_border_width": 0,
            "layout": "splith",
            "orientation": "horizontal",
            "percent": null,
            "rect": rect,
            "window_rect": rect,
            "deco_rect": rect,
            "geometry": rect,
            "urgent": false,
            "sticky": false,
            "marks": [],
            "focused": false,
            "focus": [],
            "fullscreen_mode": 0,
            "nodes": [],
            "floating_nodes": []
        })
    }

    /// An application window as sway reports it.
    fn window(id: i64, visible: bool) -> Value {
        let mut window = node(id, "con");
        window["name"] = json!(format!("window {id}"));
        window["pid"] = json!(1000 + id);
        window["visible"] = json!(visible);
        window
    }

    fn floating(id: i64) -> Value {
        let mut window = window(id, true);
        window["type"] = json!("floating_con");
        window
    }

    fn container(id: i64, layout: &str, focus: &[i64], nodes: Vec<Value>) -> Value {
        let mut container = node(id, "con");
        container["layout"] = json!(layout);
        container["focus"] = json!(focus);
        container["nodes"] = Value::Array(nodes);
        container
    }

    fn workspace(id: i64, name: &str, nodes: Vec<Value>, floating_nodes: Vec<Value>) -> Value {
        let mut workspace = node(id, "workspace");
        workspace["name"] = json!(name);
        workspace["nodes"] = Value::Array(nodes);
        workspace["floating_nodes"] = Value::Array(floating_nodes);
        workspace
    }

    /// Root with the scratchpad output and one real output.
    fn tree(workspaces: Vec<Value>) -> Node {
        let mut scratch_output = node(2, "output");
        scratch_output["name"] = json!("__i3");
        scratch_output["nodes"] = json!([workspace(3, SCRATCHPAD, vec![], vec![floating(99)])]);

        let mut output = node(4, "output");
        output["name"] = json!("eDP-1");
        output["nodes"] = Value::Array(workspaces);

        let mut root = node(1, "root");
        root["nodes"] = json!([scratch_output, output]);

        serde_json::from_value(root).expect("valid sway tree")
    }

    fn window_ids(workspace: &WorkspaceSnapshot) -> Vec<i64> {
        workspace.windows.iter().map(|window| window.id).collect()
    }

    #[test]
    fn scratchpad_is_excluded() {
        let snapshot = snapshot_from_tree(
            &tree(vec![workspace(10, "1", vec![window(11, true)], vec![])]),
            Some(10),
        );

        assert_eq!(snapshot.active, Some(10));
        assert_eq!(snapshot.workspaces.len(), 1);
        assert_eq!(snapshot.workspaces[0].name, "1");
        assert_eq!(window_ids(&snapshot.workspaces[0]), vec![11]);
    }

    #[test]
    fn split_containers_are_not_windows() {
        let snapshot = snapshot_from_tree(
            &tree(vec![workspace(
                10,
                "1",
                vec![container(
                    20,
                    "splitv",
                    &[22, 21],
                    vec![window(21, true), window(22, true)],
                )],
                vec![],
            )]),
            Some(10),
        );

        let workspace = &snapshot.workspaces[0];
        assert_eq!(window_ids(workspace), vec![21, 22]);
        assert!(workspace.windows.iter().all(|window| !window.minimized));
    }

    #[test]
    fn tiled_before_floating() {
        let snapshot = snapshot_from_tree(
            &tree(vec![workspace(
                10,
                "1",
                vec![window(11, true)],
                vec![floating(12)],
            )]),
            Some(10),
        );

        assert_eq!(window_ids(&snapshot.workspaces[0]), vec![11, 12]);
    }

    #[test]
    fn background_tabs_are_minimized() {
        let snapshot = snapshot_from_tree(
            &tree(vec![workspace(
                10,
                "1",
                vec![container(
                    20,
                    "tabbed",
                    &[22, 21, 23],
                    vec![
                        window(21, false),
                        window(22, true),
                        container(23, "splitv", &[24], vec![window(24, false)]),
                    ],
                )],
                vec![],
            )]),
            Some(10),
        );

        let minimized = snapshot.workspaces[0]
            .windows
            .iter()
            .map(|window| (window.id, window.minimized))
            .collect::<Vec<_>>();

        assert_eq!(minimized, vec![(21, true), (22, false), (24, true)]);
    }

    #[test]
    fn unfocused_workspace_windows_are_not_minimized() {
        let snapshot = snapshot_from_tree(
            &tree(vec![
                workspace(10, "1", vec![window(11, true)], vec![]),
                workspace(20, "2", vec![window(21, false)], vec![floating(22)]),
            ]),
            Some(10),
        );

        assert!(
            snapshot.workspaces[1]
                .windows
                .iter()
                .all(|window| !window.minimized)
        );
    }

    #[test]
    fn workspace_switch_writes_once() {
        let sink = RecordingSink::default();
        let store = ConfigStore::new(&Config {
            wallpaper_no_windows: String::from("/walls/empty.png"),
            wallpaper_with_windows: String::from("/walls/busy.png"),
            ..Config::default()
        })
        .expect("valid config");

        let desktop = Desktop::new();
        let tracker = WorkspaceWindowTracker::new(
            desktop.clone(),
            Rc::new(store),
            Rc::new(Background::new(
                Box::new(sink.clone()),
                "picture-uri",
                "picture-uri-dark",
            )),
            TrackerOptions::default(),
        );

        // sway flips `visible` on every window of both workspaces when switching
        desktop.apply(&snapshot_from_tree(
            &tree(vec![
                workspace(10, "1", vec![window(11, true)], vec![]),
                workspace(20, "2", vec![window(21, false)], vec![]),
            ]),
            Some(10),
        ));
        tracker.enable();
        sink.writes.borrow_mut().clear();

        desktop.apply(&snapshot_from_tree(
            &tree(vec![
                workspace(10, "1", vec![window(11, false)], vec![]),
                workspace(20, "2", vec![window(21, true)], vec![]),
            ]),
            Some(20),
        ));

        assert_eq!(
            *sink.writes.borrow(),
            vec![
                ("picture-uri".to_string(), "file:///walls/busy.png".to_string()),
                (
                    "picture-uri-dark".to_string(),
                    "file:///walls/busy.png".to_string()
                ),
            ]
        );
    }
}
