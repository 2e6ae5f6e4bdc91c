use std::sync::LazyLock;

use indexmap::IndexMap;

use crate::function_kind::FunctionKind;

pub struct FunctionDescriptor {
    pub name: &'static str,
    pub kind: FunctionKind,
    pub parameters: Vec<&'static str>,
}

impl FunctionDescriptor {
    fn new(name: &'static str, parameters: &[&'static str]) -> Self {
        FunctionDescriptor {
            name,
            kind: FunctionKind::classify(name),
            parameters: parameters.to_vec(),
        }
    }
}

/// Tools (information lookups) and actions (state changes) an NPC may call
/// in conversations that reference one `function_list_id`. `tools` is `None`
/// for lists whose tool definitions were never published.
pub struct FunctionList {
    pub tools: Option<Vec<FunctionDescriptor>>,
    pub actions: Vec<FunctionDescriptor>,
}

impl FunctionList {
    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.tools
            .iter()
            .flatten()
            .chain(self.actions.iter())
            .find(|descriptor| descriptor.name == name)
    }

    /// Whether a call to `name` is allowed here. With unknown tools, any
    /// `check_*`/`search_*` name is accepted; actions are always checked.
    pub fn declares(&self, name: &str) -> bool {
        if self.get(name).is_some() {
            return true;
        }
        self.tools.is_none() && FunctionKind::classify(name) != FunctionKind::Unrecognized
    }
}

fn item_tools() -> Vec<FunctionDescriptor> {
    vec![
        FunctionDescriptor::new(
            "search_item",
            &[
                "item_name",
                "item_price",
                "item_type",
                "item_attack",
                "item_description",
                "item_name_operator",
                "item_price_operator",
                "item_type_operator",
                "item_attack_operator",
            ],
        ),
        FunctionDescriptor::new("check_inventory", &["item_name"]),
        FunctionDescriptor::new("check_basic_info", &["item_name"]),
        FunctionDescriptor::new("check_price", &["item_name"]),
        FunctionDescriptor::new("check_type", &["item_name"]),
        FunctionDescriptor::new("check_attack", &["item_name"]),
        FunctionDescriptor::new("check_description", &["item_name"]),
    ]
}

fn quest_tools(with_inventory: bool) -> Vec<FunctionDescriptor> {
    let mut tools = vec![FunctionDescriptor::new(
        "search_quest",
        &[
            "quest_name",
            "quest_level",
            "quest_duration",
            "quest_reward",
            "quest_description",
            "quest_name_operator",
            "quest_level_operator",
            "quest_duration_operator",
            "quest_reward_operator",
        ],
    )];
    if with_inventory {
        tools.push(FunctionDescriptor::new("check_inventory", &["quest_name"]));
    }
    tools.extend([
        FunctionDescriptor::new("check_basic_info", &["quest_name"]),
        FunctionDescriptor::new("check_level", &["quest_name"]),
        FunctionDescriptor::new("check_duration", &["quest_name"]),
        FunctionDescriptor::new("check_reward", &["quest_name"]),
        FunctionDescriptor::new("check_description", &["quest_name"]),
    ]);
    tools
}

pub static FUNCTION_LISTS: LazyLock<IndexMap<String, FunctionList>> = LazyLock::new(|| {
    let mut m = IndexMap::new();
    // weapon shop
    m.insert(
        "function_list_id_0001".to_string(),
        FunctionList {
            tools: Some(item_tools()),
            actions: vec![
                FunctionDescriptor::new("sell", &["item_names"]),
                FunctionDescriptor::new("equip", &["item_name"]),
            ],
        },
    );
    m.insert(
        "function_list_id_0003".to_string(),
        FunctionList {
            tools: Some(item_tools()),
            actions: vec![
                FunctionDescriptor::new("sell_request_record", &["item_name"]),
                FunctionDescriptor::new("sell", &["item_names"]),
                FunctionDescriptor::new("equip", &["item_name"]),
            ],
        },
    );
    // quest board
    m.insert(
        "function_list_id_0004".to_string(),
        FunctionList {
            tools: Some(quest_tools(true)),
            actions: vec![
                FunctionDescriptor::new("select", &["quest_name"]),
                FunctionDescriptor::new("start", &["quest_name"]),
            ],
        },
    );
    // actions only; its tool definitions are not available
    m.insert(
        "function_list_id_0005".to_string(),
        FunctionList {
            tools: None,
            actions: vec![
                FunctionDescriptor::new("select_request_confirm", &["quest_name"]),
                FunctionDescriptor::new("select", &["quest_name"]),
                FunctionDescriptor::new("start", &["quest_name"]),
            ],
        },
    );
    m.insert(
        "function_list_id_0006".to_string(),
        FunctionList {
            tools: Some(quest_tools(false)),
            actions: vec![
                FunctionDescriptor::new("select_request_record", &["quest_name"]),
                FunctionDescriptor::new("select", &["quest_name"]),
                FunctionDescriptor::new("start", &["quest_name"]),
            ],
        },
    );
    m
});
