//! Built-in synonym lists. The first name in each group is canonical.

pub(super) const COC_GROUPS: &[&[&str]] = &[
    // Characteristics
    &["力量", "str", "strength"],
    &["体质", "con", "constitution"],
    &["体型", "siz", "size", "体形"],
    &["敏捷", "dex", "dexterity"],
    &["外貌", "app", "appearance"],
    &["智力", "int", "intelligence", "灵感", "idea"],
    &["意志", "pow", "power"],
    &["教育", "edu", "education", "知识", "know"],
    // Vitals
    &["生命", "hp", "生命值", "体力"],
    &["魔法", "mp", "魔法值"],
    &["理智", "san", "理智值", "sanity"],
    &["幸运", "luck", "运气"],
    &["克苏鲁神话", "cm", "克苏鲁", "cthulhu mythos"],
    // Derived
    &["生命上限", "hpmax", "最大生命"],
    &["魔法上限", "mpmax", "最大魔法"],
    &["理智上限", "sanmax", "最大理智"],
    &["体格", "build"],
    &["移动力", "mov", "move"],
    &["伤害加值", "db", "damage bonus"],
    // Skills
    &["侦察", "spot hidden", "spot", "侦查"],
    &["图书馆", "图书馆使用", "library use", "library"],
    &["聆听", "listen"],
    &["闪避", "dodge"],
    &["信用", "信用评级", "credit rating", "cr", "信誉"],
    &["心理学", "psychology"],
    &["说服", "persuade"],
    &["话术", "fast talk"],
    &["魅惑", "charm"],
    &["恐吓", "intimidate"],
    &["潜行", "stealth"],
    &["急救", "first aid"],
    &["医学", "medicine"],
    &["斗殴", "格斗:斗殴", "brawl"],
    &["手枪", "射击:手枪", "handgun"],
    &["步霰", "射击:步枪/霰弹枪", "rifle"],
    &["母语", "own language"],
    &["神秘学", "occult"],
    &["追踪", "track"],
    &["导航", "navigate"],
    &["乔装", "disguise"],
    &["锁匠", "locksmith"],
    &["机械维修", "mechanical repair", "机修"],
    &["电气维修", "electrical repair", "电器维修"],
    &["跳跃", "jump"],
    &["攀爬", "climb"],
    &["游泳", "swim"],
    &["投掷", "throw"],
    &["骑术", "ride"],
    &["汽车驾驶", "驾驶:汽车", "drive auto"],
    &["估价", "appraise"],
    &["会计", "accounting"],
    &["法律", "law"],
    &["历史", "history"],
    &["考古学", "archaeology"],
    &["人类学", "anthropology"],
    &["博物学", "natural world"],
    &["计算机使用", "计算机", "computer use"],
    &["电子学", "electronics"],
    &["精神分析", "psychoanalysis"],
    &["妙手", "sleight of hand"],
];

pub(super) const DND_GROUPS: &[&[&str]] = &[
    // Ability scores
    &["力量", "str", "strength"],
    &["敏捷", "dex", "dexterity"],
    &["体质", "con", "constitution"],
    &["智力", "int", "intelligence"],
    &["感知", "wis", "wisdom"],
    &["魅力", "cha", "charisma"],
    // Ability modifiers
    &["力量调整", "strmod"],
    &["敏捷调整", "dexmod"],
    &["体质调整", "conmod"],
    &["智力调整", "intmod"],
    &["感知调整", "wismod"],
    &["魅力调整", "chamod"],
    // Saving throws
    &["力量豁免", "strsave", "力量豁免检定"],
    &["敏捷豁免", "dexsave", "敏捷豁免检定"],
    &["体质豁免", "consave", "体质豁免检定"],
    &["智力豁免", "intsave", "智力豁免检定"],
    &["感知豁免", "wissave", "感知豁免检定"],
    &["魅力豁免", "chasave", "魅力豁免检定"],
    // Skills
    &["运动", "athletics"],
    &["体操", "acrobatics", "特技"],
    &["巧手", "sleight of hand"],
    &["隐匿", "stealth", "潜行"],
    &["奥秘", "arcana"],
    &["历史", "history"],
    &["调查", "investigation"],
    &["自然", "nature"],
    &["宗教", "religion"],
    &["驯兽", "animal handling", "驯养"],
    &["洞悉", "insight"],
    &["医药", "medicine", "医疗"],
    &["察觉", "perception"],
    &["求生", "survival", "生存"],
    &["欺瞒", "deception", "欺骗"],
    &["威吓", "intimidation"],
    &["表演", "performance"],
    &["游说", "persuasion", "说服"],
    // Vitals and derived
    &["等级", "lv", "level"],
    &["经验", "xp", "exp", "经验值"],
    &["生命", "hp", "生命值"],
    &["生命上限", "hpmax", "最大生命"],
    &["护甲", "ac", "armor class", "护甲等级"],
    &["熟练加值", "prof", "熟练", "proficiency"],
    &["先攻", "init", "initiative"],
];
