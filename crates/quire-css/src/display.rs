//! CSS Display property types and parsing
//!
//! [§ 2 Box Layout Modes: the display property](https://www.w3.org/TR/css-display-3/#the-display-properties)

use serde::Serialize;
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

/// [§ 2.1 Outer Display Roles](https://www.w3.org/TR/css-display-3/#outer-role)
///
/// "The `<display-outside>` keywords specify the element's outer display type,
/// which is essentially its principal box's role in flow layout."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OuterDisplayType {
    /// "The element generates a block-level box when placed in flow layout."
    Block,
    /// "The element generates an inline-level box when placed in flow layout."
    Inline,
    /// Internal table boxes and `display: none` take no part in flow layout.
    None,
}

/// A resolved `display` value.
///
/// Parsed from the canonical keyword stored in the property map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, StrumDisplay, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    /// `inline`
    #[default]
    Inline,
    /// `block`
    Block,
    /// `inline-block`
    InlineBlock,
    /// [CSS Lists § 2](https://www.w3.org/TR/css-lists-3/#declaring-a-list-item)
    /// "the list-item keyword causes the element to generate a ::marker
    /// pseudo-element"
    ListItem,
    /// `table`
    Table,
    /// `inline-table`
    InlineTable,
    /// `table-row-group`
    TableRowGroup,
    /// `table-header-group`
    TableHeaderGroup,
    /// `table-footer-group`
    TableFooterGroup,
    /// `table-row`
    TableRow,
    /// `table-column-group`
    TableColumnGroup,
    /// `table-column`
    TableColumn,
    /// `table-cell`
    TableCell,
    /// `table-caption`
    TableCaption,
    /// `flex`
    Flex,
    /// `inline-flex`
    InlineFlex,
    /// `grid`
    Grid,
    /// `inline-grid`
    InlineGrid,
    /// `flow-root`
    FlowRoot,
    /// [§ 2.5 Box Generation](https://www.w3.org/TR/css-display-3/#box-generation)
    /// "The element itself does not generate any boxes, but its children and
    /// pseudo-elements still generate boxes as normal."
    Contents,
    /// `run-in`
    RunIn,
    /// [§ 2.5](https://www.w3.org/TR/css-display-3/#valdef-display-none)
    /// "The element and its descendants generate no boxes or text runs."
    None,
}

impl Display {
    /// Parse a canonical display keyword. Unknown keywords map to `inline`,
    /// the initial value.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Self {
        keyword.parse().unwrap_or_default()
    }

    /// [§ 2.1 Outer Display Roles](https://www.w3.org/TR/css-display-3/#outer-role)
    #[must_use]
    pub const fn outer(self) -> OuterDisplayType {
        match self {
            Self::Inline
            | Self::InlineBlock
            | Self::InlineTable
            | Self::InlineFlex
            | Self::InlineGrid
            | Self::RunIn
            | Self::Contents => OuterDisplayType::Inline,
            Self::Block
            | Self::ListItem
            | Self::Table
            | Self::Flex
            | Self::Grid
            | Self::FlowRoot
            | Self::TableCaption => OuterDisplayType::Block,
            Self::TableRowGroup
            | Self::TableHeaderGroup
            | Self::TableFooterGroup
            | Self::TableRow
            | Self::TableColumnGroup
            | Self::TableColumn
            | Self::TableCell
            | Self::None => OuterDisplayType::None,
        }
    }

    /// Whether the element participates in block-level flow.
    #[must_use]
    pub const fn is_block_level(self) -> bool {
        matches!(self.outer(), OuterDisplayType::Block)
    }

    /// [CSS Tables § 2](https://www.w3.org/TR/css-tables-3/#table-structure)
    /// Whether this is one of the internal table display types.
    #[must_use]
    pub const fn is_internal_table(self) -> bool {
        matches!(
            self,
            Self::TableRowGroup
                | Self::TableHeaderGroup
                | Self::TableFooterGroup
                | Self::TableRow
                | Self::TableColumnGroup
                | Self::TableColumn
                | Self::TableCell
                | Self::TableCaption
        )
    }

    /// The canonical keyword.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        self.into()
    }
}
