use enumset::EnumSetType;
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// The arm that is drawn underneath the core body. The other arm is drawn on top of it.
pub const UNDER_ARM: Side = Side::Right;

/// The fixed set of anatomical parts an avatar is assembled from.
///
/// Declaration order is the layout table order, which is also the tie-breaker when two parts
/// share the same z-index.
#[derive(EnumSetType, Debug, EnumIter, EnumCount, EnumString, Display, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum BodyPart {
    LeftFoot,
    RightFoot,

    LeftLowerLeg,
    RightLowerLeg,

    LeftUpperLeg,
    RightUpperLeg,
    RightUpperArm,
    RightLowerArm,
    RightHand,

    CoreBody,

    LeftUpperArm,
    LeftLowerArm,
    LeftHand,

    Head,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Side {
    Left,
    Right,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(
    feature = "serializable_parts",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum View {
    #[default]
    Front,
    Back,
}

impl View {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

impl BodyPart {
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// The PascalCase name used in asset file names, e.g. `LeftUpperArm`.
    #[must_use]
    pub fn file_stem(self) -> String {
        let name = self.name();
        let mut chars = name.chars();

        chars.next().map_or_else(String::new, |first| {
            first.to_ascii_uppercase().to_string() + chars.as_str()
        })
    }

    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::LeftFoot
            | Self::LeftLowerLeg
            | Self::LeftUpperLeg
            | Self::LeftUpperArm
            | Self::LeftLowerArm
            | Self::LeftHand => Some(Side::Left),
            Self::RightFoot
            | Self::RightLowerLeg
            | Self::RightUpperLeg
            | Self::RightUpperArm
            | Self::RightLowerArm
            | Self::RightHand => Some(Side::Right),
            Self::CoreBody | Self::Head => None,
        }
    }

    #[must_use]
    pub const fn is_arm(self) -> bool {
        matches!(
            self,
            Self::LeftUpperArm
                | Self::LeftLowerArm
                | Self::LeftHand
                | Self::RightUpperArm
                | Self::RightLowerArm
                | Self::RightHand
        )
    }

    #[must_use]
    pub const fn is_leg(self) -> bool {
        matches!(
            self,
            Self::LeftUpperLeg
                | Self::LeftLowerLeg
                | Self::LeftFoot
                | Self::RightUpperLeg
                | Self::RightLowerLeg
                | Self::RightFoot
        )
    }

    /// Draw order of this part. Lower values are drawn first (further back).
    ///
    /// Feet, then lower legs, then the upper legs together with the whole under arm, then the
    /// core body, then the over arm, and the head last.
    #[must_use]
    pub fn z_index(self) -> i32 {
        match self {
            Self::LeftFoot | Self::RightFoot => 1,
            Self::LeftLowerLeg | Self::RightLowerLeg => 2,
            Self::LeftUpperLeg | Self::RightUpperLeg => 3,
            Self::CoreBody => 4,
            Self::Head => 6,
            arm if arm.side() == Some(UNDER_ARM) => 3,
            _ => 5,
        }
    }

    /// Position of this part in the layout table.
    #[must_use]
    pub const fn table_index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::{EnumCount, IntoEnumIterator};

    use super::{BodyPart, Side, View, UNDER_ARM};

    #[test]
    fn there_are_fourteen_parts() {
        assert_eq!(BodyPart::COUNT, 14);
        assert_eq!(BodyPart::iter().filter(|p| p.is_arm()).count(), 6);
        assert_eq!(BodyPart::iter().filter(|p| p.is_leg()).count(), 6);
    }

    #[test]
    fn names_follow_asset_conventions() {
        assert_eq!(BodyPart::LeftUpperArm.name(), "leftUpperArm");
        assert_eq!(BodyPart::LeftUpperArm.file_stem(), "LeftUpperArm");
        assert_eq!(BodyPart::CoreBody.file_stem(), "CoreBody");
        assert_eq!(BodyPart::from_str("rightFoot"), Ok(BodyPart::RightFoot));
    }

    #[test]
    fn anatomical_layering() {
        let over_arm = BodyPart::iter()
            .filter(|p| p.is_arm() && p.side() != Some(UNDER_ARM))
            .collect::<Vec<_>>();
        let under_arm = BodyPart::iter()
            .filter(|p| p.is_arm() && p.side() == Some(UNDER_ARM))
            .collect::<Vec<_>>();

        assert_eq!(UNDER_ARM, Side::Right);
        assert_eq!(over_arm.len(), 3);
        assert_eq!(under_arm.len(), 3);

        let core = BodyPart::CoreBody.z_index();

        for part in under_arm {
            assert!(part.z_index() < core);
            assert_eq!(part.z_index(), BodyPart::LeftUpperLeg.z_index());
        }

        for part in over_arm {
            assert!(part.z_index() > core);
        }

        for part in BodyPart::iter().filter(|p| *p != BodyPart::Head) {
            assert!(part.z_index() < BodyPart::Head.z_index());
        }

        assert!(BodyPart::LeftFoot.z_index() < BodyPart::LeftUpperLeg.z_index());
        assert!(BodyPart::RightLowerLeg.z_index() < BodyPart::RightUpperLeg.z_index());
    }

    #[test]
    fn views_parse_and_flip() {
        assert_eq!(View::from_str("back"), Ok(View::Back));
        assert_eq!(View::Front.to_string(), "front");
        assert_eq!(View::Front.other(), View::Back);
        assert_eq!(View::default(), View::Front);
    }
}
